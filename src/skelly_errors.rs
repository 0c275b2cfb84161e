use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkellyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid landmark specification for aspect '{aspect}': {reason}")]
    InvalidLandmarks { aspect: String, reason: String },

    #[error("Invalid naming pattern '{0}': expected an index placeholder such as '{{}}' or '{{:03}}'")]
    InvalidNamingPattern(String),

    #[error("Layout order references unknown aspect: {0}")]
    UnknownLayoutAspect(String),

    #[error("Aspect '{0}' appears more than once in the layout order")]
    DuplicateLayoutAspect(String),

    #[error("Marker name '{0}' is defined more than once")]
    DuplicateMarker(String),

    #[error("Marker '{marker}' referenced by {context} is neither a tracked nor a virtual marker")]
    UnresolvedMarker { context: String, marker: String },

    #[error("Virtual markers form a dependency cycle: {0:?}")]
    VirtualMarkerCycle(Vec<String>),

    #[error("Virtual marker '{marker}' has {names} component names but {weights} weights")]
    WeightCountMismatch {
        marker: String,
        names: usize,
        weights: usize,
    },

    #[error("Weights of virtual marker '{marker}' sum to {sum}, expected 1")]
    InvalidWeightSum { marker: String, sum: f64 },

    #[error("Center of mass percentages sum to {0}, expected 1")]
    InvalidMassFractionSum(f64),

    #[error("Center of mass value '{field}' of segment '{segment}' is {value}, expected a value in [0, 1]")]
    CenterOfMassOutOfRange {
        segment: String,
        field: &'static str,
        value: f64,
    },

    #[error("Center of mass definition references unknown segment: {0}")]
    UnknownSegment(String),

    #[error("Center of mass definitions require segment connections")]
    MissingSegmentConnections,

    #[error("Shape mismatch for {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Aspect not found: {0}")]
    UnknownAspect(String),

    #[error("Trajectory '{trajectory}' not found in aspect '{aspect}'")]
    UnknownTrajectory { aspect: String, trajectory: String },

    #[error("Marker not found: {0}")]
    UnknownMarker(String),

    #[error("Frame {frame} is out of range ({n_frames} frames)")]
    FrameOutOfRange { frame: usize, n_frames: usize },

    #[error("Aspect '{0}' has no reprojection error")]
    NoReprojectionError(String),

    #[error("Malformed trajectory table: {0}")]
    MalformedTable(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for SkellyError {
    fn eq(&self, other: &Self) -> bool {
        use SkellyError::*;
        match (self, other) {
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (
                InvalidLandmarks {
                    aspect: a1,
                    reason: r1,
                },
                InvalidLandmarks {
                    aspect: a2,
                    reason: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (InvalidNamingPattern(a), InvalidNamingPattern(b)) => a == b,
            (UnknownLayoutAspect(a), UnknownLayoutAspect(b)) => a == b,
            (DuplicateLayoutAspect(a), DuplicateLayoutAspect(b)) => a == b,
            (DuplicateMarker(a), DuplicateMarker(b)) => a == b,
            (
                UnresolvedMarker {
                    context: c1,
                    marker: m1,
                },
                UnresolvedMarker {
                    context: c2,
                    marker: m2,
                },
            ) => c1 == c2 && m1 == m2,
            (VirtualMarkerCycle(a), VirtualMarkerCycle(b)) => a == b,
            (
                WeightCountMismatch {
                    marker: m1,
                    names: n1,
                    weights: w1,
                },
                WeightCountMismatch {
                    marker: m2,
                    names: n2,
                    weights: w2,
                },
            ) => m1 == m2 && n1 == n2 && w1 == w2,
            (InvalidWeightSum { marker: m1, .. }, InvalidWeightSum { marker: m2, .. }) => {
                m1 == m2
            }
            (InvalidMassFractionSum(_), InvalidMassFractionSum(_)) => true,
            (
                CenterOfMassOutOfRange {
                    segment: s1,
                    field: f1,
                    ..
                },
                CenterOfMassOutOfRange {
                    segment: s2,
                    field: f2,
                    ..
                },
            ) => s1 == s2 && f1 == f2,
            (UnknownSegment(a), UnknownSegment(b)) => a == b,
            (
                ShapeMismatch {
                    context: c1,
                    expected: e1,
                    actual: a1,
                },
                ShapeMismatch {
                    context: c2,
                    expected: e2,
                    actual: a2,
                },
            ) => c1 == c2 && e1 == e2 && a1 == a2,
            (UnknownAspect(a), UnknownAspect(b)) => a == b,
            (
                UnknownTrajectory {
                    aspect: a1,
                    trajectory: t1,
                },
                UnknownTrajectory {
                    aspect: a2,
                    trajectory: t2,
                },
            ) => a1 == a2 && t1 == t2,
            (UnknownMarker(a), UnknownMarker(b)) => a == b,
            (
                FrameOutOfRange {
                    frame: f1,
                    n_frames: n1,
                },
                FrameOutOfRange {
                    frame: f2,
                    n_frames: n2,
                },
            ) => f1 == f2 && n1 == n2,
            (NoReprojectionError(a), NoReprojectionError(b)) => a == b,
            (MalformedTable(a), MalformedTable(b)) => a == b,

            // wrapped errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            (MissingSegmentConnections, MissingSegmentConnections) => true,

            _ => false,
        }
    }
}
