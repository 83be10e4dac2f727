//! Warning and failure alerts collected during an operation.

use std::sync::Mutex;

use opbrep_topo::Shape;
use serde::Serialize;

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gravity {
    /// The operation went on; the result may be degraded.
    Warning,
    /// The operation could not complete.
    Fail,
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKind {
    /// The orientation of a split relative to its original could not be decided.
    UnableToOrientTheShape,
    /// A split part was degenerate and was dropped.
    DegeneratedSplit,
    /// A part could not be classified against the other operand.
    UnableToClassify,
    /// Two surfaces whose intersection is not supported.
    UnsupportedIntersection,
    /// A face could not be rebuilt from its edges.
    UnableToBuildFace,
    /// The operation was cancelled by the caller.
    UserBreak,
}

/// One recorded alert.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Severity.
    pub gravity: Gravity,
    /// Category.
    pub kind: AlertKind,
    /// Human-readable details.
    pub message: String,
    /// Shapes involved.
    #[serde(skip)]
    pub shapes: Vec<Shape>,
}

/// Ordered, thread-safe list of alerts.
#[derive(Debug, Default)]
pub struct Report {
    alerts: Mutex<Vec<Alert>>,
}

impl Report {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an alert.
    pub fn add(&self, gravity: Gravity, kind: AlertKind, message: impl Into<String>, shapes: Vec<Shape>) {
        let message = message.into();
        match gravity {
            Gravity::Warning => tracing::warn!(?kind, %message, "alert"),
            Gravity::Fail => tracing::error!(?kind, %message, "alert"),
        }
        let mut alerts = self.alerts.lock().unwrap_or_else(|p| p.into_inner());
        alerts.push(Alert {
            gravity,
            kind,
            message,
            shapes,
        });
    }

    /// Record a warning.
    pub fn add_warning(&self, kind: AlertKind, message: impl Into<String>, shapes: Vec<Shape>) {
        self.add(Gravity::Warning, kind, message, shapes);
    }

    /// Snapshot of the alerts in insertion order.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// True if an alert of `kind` was recorded.
    pub fn has_alert(&self, kind: AlertKind) -> bool {
        self.alerts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(|a| a.kind == kind)
    }

    /// True if any failure was recorded.
    pub fn has_fail(&self) -> bool {
        self.alerts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(|a| a.gravity == Gravity::Fail)
    }

    /// Forget all alerts.
    pub fn clear(&self) {
        self.alerts.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Serialize the alerts as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.alerts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json() {
        let r = Report::new();
        assert!(!r.has_alert(AlertKind::UnableToOrientTheShape));
        r.add_warning(AlertKind::UnableToOrientTheShape, "no point", Vec::new());
        assert!(r.has_alert(AlertKind::UnableToOrientTheShape));
        assert!(!r.has_fail());
        let json = r.to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["kind"], "UnableToOrientTheShape");
        assert_eq!(v[0]["gravity"], "Warning");
        r.clear();
        assert!(r.alerts().is_empty());
    }
}
