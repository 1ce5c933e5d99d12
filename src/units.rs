//! Field units. Everything in the crate works in inches; these convert into it.

/// Side length of the square playing field.
pub const FIELD_SIZE: f64 = 144.0;

pub fn ft(from_feet: f64) -> f64 {
    from_feet * 12.0
}
pub fn tile(from_tiles: f64) -> f64 {
    from_tiles * 24.0
}
pub fn m(from_meters: f64) -> f64 {
    from_meters * 39.3701
}
pub fn cm(from_centimeters: f64) -> f64 {
    from_centimeters * 0.393701
}
