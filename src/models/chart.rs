use std::fmt;

/// Kind of chart window a script can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Scatter,
    Number,
    LinearGauge,
    AngularGauge,
    /// Unrecognized kind string; refused before a window is opened.
    Unknown,
}

impl ChartKind {
    /// Parse the kind string used by the script API.
    pub fn parse(s: &str) -> Self {
        match s {
            "line" => Self::Line,
            "scatter" => Self::Scatter,
            "number" => Self::Number,
            "linear-gauge" => Self::LinearGauge,
            "angular-gauge" => Self::AngularGauge,
            _ => Self::Unknown,
        }
    }

    /// Only point-series charts carry CSV data.
    pub fn has_csv_data(self) -> bool {
        matches!(self, Self::Line | Self::Scatter)
    }

    /// Window title used by chart backends.
    pub fn window_title(self) -> &'static str {
        match self {
            Self::Line => "Line Chart",
            Self::Scatter => "Scatter Chart",
            Self::Number => "Number Chart",
            Self::LinearGauge => "Linear Gauge",
            Self::AngularGauge => "Angular Gauge",
            Self::Unknown => "Chart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Number => "number",
            Self::LinearGauge => "linear-gauge",
            Self::AngularGauge => "angular-gauge",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Display configuration for one chart window.
///
/// Which fields are meaningful depends on `kind`: line and scatter charts
/// use the axis labels and maxima, number and gauge charts use `label`, and
/// gauges additionally use the value range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub label: String,
    pub x_label: String,
    pub y_label: String,
    pub x_max: f64,
    pub y_max: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub width: u32,
    pub autoscale: bool,
}

impl ChartSpec {
    fn base(kind: ChartKind, title: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            label: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            x_max: 0.0,
            y_max: 0.0,
            value_min: 0.0,
            value_max: 0.0,
            width: 0,
            autoscale: false,
        }
    }

    pub fn line(
        title: &str,
        x_label: &str,
        y_label: &str,
        x_max: f64,
        y_max: f64,
        width: u32,
        autoscale: bool,
    ) -> Self {
        Self {
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_max,
            y_max,
            width,
            autoscale,
            ..Self::base(ChartKind::Line, title)
        }
    }

    pub fn scatter(
        title: &str,
        x_label: &str,
        y_label: &str,
        x_max: f64,
        y_max: f64,
        width: u32,
        autoscale: bool,
    ) -> Self {
        Self {
            kind: ChartKind::Scatter,
            ..Self::line(title, x_label, y_label, x_max, y_max, width, autoscale)
        }
    }

    pub fn number(title: &str, label: &str, width: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            ..Self::base(ChartKind::Number, title)
        }
    }

    pub fn linear_gauge(title: &str, label: &str, value_min: f64, value_max: f64, width: u32) -> Self {
        Self {
            label: label.to_string(),
            value_min,
            value_max,
            width,
            ..Self::base(ChartKind::LinearGauge, title)
        }
    }

    pub fn angular_gauge(title: &str, label: &str, value_min: f64, value_max: f64, width: u32) -> Self {
        Self {
            kind: ChartKind::AngularGauge,
            ..Self::linear_gauge(title, label, value_min, value_max, width)
        }
    }
}
