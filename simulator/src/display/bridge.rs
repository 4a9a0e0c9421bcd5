use crate::display::model::{DisplayModel, QualityGate};
use rppgcore::interface::{DisplaySink, DisplayView};
use std::sync::{Arc, RwLock};

/// Display sink that keeps the latest gated model and echoes it to stdout.
#[derive(Clone)]
pub struct ConsoleDisplay {
    state: Arc<RwLock<DisplayModel>>,
    gate: QualityGate,
    echo: bool,
}

impl ConsoleDisplay {
    pub fn new(gate: QualityGate) -> Self {
        Self {
            state: Arc::new(RwLock::new(DisplayModel::default())),
            gate,
            echo: true,
        }
    }

    /// Same as `new` but without stdout output.
    #[cfg(test)]
    pub fn quiet(gate: QualityGate) -> Self {
        Self {
            echo: false,
            ..Self::new(gate)
        }
    }

    pub fn publish_status(&self, message: &str) {
        if self.echo {
            println!("[DISPLAY] {}", message);
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> DisplayModel {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn publish(&self, view: &DisplayView) {
        let model = DisplayModel::from_view(view, &self.gate);
        self.publish_status(&model.summary_line());
        if let Ok(mut guard) = self.state.write() {
            *guard = model;
        }
    }
}
