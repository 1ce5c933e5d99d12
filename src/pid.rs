use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_limit: f64,
}

impl PidGains {
    pub const fn p(kp: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            integral_limit: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_limit: f64,
    pub integral_decay: f64,
    /// Output clamp, symmetric. Zero disables it.
    pub output_limit: f64,
    prev_error: Option<f64>,
    integral: f64,
    disabled: bool,
}

impl From<PidGains> for Pid {
    fn from(g: PidGains) -> Self {
        Self::new(g.kp, g.ki, g.kd, g.integral_limit)
    }
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit,
            integral_decay: 0.995,
            output_limit: 0.0,
            prev_error: None,
            integral: 0.0,
            disabled: false,
        }
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn next(&mut self, error: f64, dt: f64) -> f64 {
        if self.disabled || !error.is_finite() {
            self.reset();
            return 0.0;
        }

        self.integral *= self.integral_decay;
        self.integral += error * dt;
        if self.integral_limit > 0.0 {
            self.integral = self
                .integral
                .clamp(-self.integral_limit, self.integral_limit);
        }

        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };

        self.prev_error = Some(error);
        let out = (self.kp * error) + (self.ki * self.integral) + (self.kd * derivative);
        if self.output_limit > 0.0 {
            out.clamp(-self.output_limit, self.output_limit)
        } else {
            out
        }
    }

    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0.0;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.reset();
        }
    }
}
