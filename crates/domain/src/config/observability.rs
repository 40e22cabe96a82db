use serde::{Deserialize, Serialize};

/// `[observability]`: optional OTLP trace export.
///
/// With no endpoint the gateway only writes JSON logs. With one, each
/// `agent_run` span and the collaborator calls beneath it are exported
/// over OTLP/gRPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Collector address, e.g. `http://localhost:4317`.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Fraction of traces kept, decided once per trace id.
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl ObservabilityConfig {
    /// `sample_rate` clamped into `0.0..=1.0`; NaN keeps nothing.
    pub fn sample_ratio(&self) -> f64 {
        if self.sample_rate.is_nan() {
            0.0
        } else {
            self.sample_rate.clamp(0.0, 1.0)
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
        }
    }
}

fn d_service_name() -> String {
    "agentrelay".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_is_off_unless_configured() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert!(cfg.otlp_endpoint.is_none());
        assert_eq!(cfg.service_name, "agentrelay");
        assert_eq!(cfg.sample_ratio(), 1.0);
    }

    #[test]
    fn ratio_is_clamped() {
        let cfg: ObservabilityConfig = toml::from_str(
            r#"
            otlp_endpoint = "http://otel:4317"
            sample_rate = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.otlp_endpoint.as_deref(), Some("http://otel:4317"));
        assert_eq!(cfg.sample_ratio(), 1.0);

        let low = ObservabilityConfig {
            sample_rate: -0.2,
            ..Default::default()
        };
        assert_eq!(low.sample_ratio(), 0.0);
    }
}
