//! Switched AC load output

/// An on/off load driver (solid-state relay on a heater or fan)
pub trait SwitchOutput {
    /// Switch the load on or off
    fn set_on(&mut self, on: bool);

    /// Check if the load is currently switched on
    fn is_on(&self) -> bool;
}
