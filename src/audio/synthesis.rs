//! Procedural music for the live runtime when no input device is used.

/// Glicol composition: kick on the beat for low-band transients, a filtered
/// saw lead for the mids and a hat line for the highs
pub const GLICOL_COMPOSITION: &str = r#"
~kick_gate: speed 2.0 >> seq 60 _ 60 _
~kick_env: ~kick_gate >> envperc 0.002 0.25
~kick: sin 55 >> mul ~kick_env >> mul 0.6
~lead_gate: speed 4.0 >> seq 60 _60 _~a 48
~a: choose 48 48 48 72 0 0 0
~lead_amp: ~lead_gate >> envperc 0.001 0.1
~pit: ~lead_gate >> mul 261.63
~lead: saw ~pit >> mul ~lead_amp >> lpf ~mod 5.0 >> mul 0.1
~mod: sin 0.2 >> mul 1300 >> add 1500
~hat_gate: speed 8.0 >> seq 60 60 _60 60
~hat_env: ~hat_gate >> envperc 0.001 0.03
~hat: noise 42 >> hpf 6000 1.0 >> mul ~hat_env >> mul 0.08
o: mix ~kick ~lead ~hat >> plate 0.1
"#;
