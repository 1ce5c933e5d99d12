use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    #[default]
    Closed,
    Open,
}

/// Servo positions in [0, 1].
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct GateSetpoints {
    pub open: f64,
    pub closed: f64,
}

impl Default for GateSetpoints {
    fn default() -> Self {
        Self {
            // 140 of the servo's 180 degrees
            open: 140.0 / 180.0,
            closed: 0.5,
        }
    }
}

#[derive(Debug)]
pub struct Gate {
    setpoints: GateSetpoints,
    state: GateState,
}

impl Gate {
    pub fn new(setpoints: GateSetpoints) -> Self {
        Self {
            setpoints,
            state: GateState::Closed,
        }
    }

    pub fn update(&mut self, at_speed: bool, ready: bool) -> GateState {
        let next = if at_speed && ready {
            GateState::Open
        } else {
            GateState::Closed
        };
        if next != self.state {
            debug!("gate {:?} (at_speed={at_speed}, ready={ready})", next);
        }
        self.state = next;
        next
    }

    pub fn close(&mut self) {
        self.state = GateState::Closed;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn position(&self) -> f64 {
        match self.state {
            GateState::Open => self.setpoints.open,
            GateState::Closed => self.setpoints.closed,
        }
    }
}
