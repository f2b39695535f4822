/// Number of features every model is trained on.
pub const FEATURE_COUNT: usize = 8;

/// Ordered list of feature names.
/// This order is the contract between training and inference and is stored
/// verbatim in every model artifact. Any change here is a breaking change for
/// persisted models.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "lagClose1",
    "lagClose2",
    "lagClose3",
    "ret1",
    "ret3",
    "ma5",
    "ma10",
    "vol5",
];

/// One feature vector in `FEATURE_NAMES` order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// The schema as owned strings, the shape it takes inside an artifact.
pub fn feature_schema() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Returns true when a persisted schema matches the current one exactly.
pub fn matches_schema(schema: &[String]) -> bool {
    schema.len() == FEATURE_COUNT
        && schema
            .iter()
            .zip(FEATURE_NAMES.iter())
            .all(|(persisted, expected)| persisted == expected)
}
