//! Log-key derivation for loss and metric outputs
//!
//! Keys are `/`-joined path segments. Loss keys additionally tag the segment
//! derived from the loss itself with a `_loss` suffix (unless it already
//! ends in `loss`), so every loss entry is visibly a loss in the logs.
//! Collisions are resolved with `_1`, `_2`, ... in traversal order.

use crate::spec::Path;

/// Normalize an identifier to `lower_snake_case`.
///
/// CamelCase words are split on capitals, then runs of single-letter
/// fragments are merged back together, so `MeanSquaredError` becomes
/// `mean_squared_error` while `MSE` becomes `mse`.
pub fn lower_snake_case(s: &str) -> String {
    let mut snake = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i != 0 {
            snake.push('_');
        }
        for lower in c.to_lowercase() {
            snake.push(lower);
        }
    }

    let parts: Vec<&str> = snake.split('_').collect();
    let mut merged: Vec<String> = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        if i == 0 || parts[i - 1].chars().count() > 1 {
            merged.push((*part).to_string());
        } else if let Some(last) = merged.last_mut() {
            last.push_str(part);
        }
    }
    merged.join("_")
}

/// Base key for a loss output: the leaf-derived segment gets a `_loss`
/// suffix unless it already ends in `loss`.
pub fn loss_key(path: &Path) -> String {
    let mut segments = path.segments().to_vec();
    let leaf = &mut segments[path.leaf_index()];
    if !leaf.ends_with("loss") {
        leaf.push_str("_loss");
    }
    segments.join("/")
}

/// Base key for a metric output: plain `/`-join, no suffix rule.
pub fn metric_key(path: &Path) -> String {
    path.segments().join("/")
}

/// Disambiguate `base` against already-assigned keys by appending the first
/// free `_1`, `_2`, ... suffix. Deterministic for a fixed traversal order.
pub fn unique_key(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut i = 1;
    loop {
        let candidate = format!("{base}_{i}");
        if !taken(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str], leaf: usize) -> Path {
        Path::new(segments.iter().map(|s| s.to_string()).collect(), leaf)
    }

    #[test]
    fn test_lower_snake_case() {
        assert_eq!(
            lower_snake_case("MeanSquaredLogarithmicError"),
            "mean_squared_logarithmic_error"
        );
        assert_eq!(lower_snake_case("MSE"), "mse");
        assert_eq!(lower_snake_case("already_snake"), "already_snake");
        assert_eq!(lower_snake_case("BinaryAccuracy"), "binary_accuracy");
    }

    #[test]
    fn test_loss_key_suffixes_leaf_segment() {
        assert_eq!(loss_key(&path(&["mae"], 0)), "mae_loss");
        assert_eq!(loss_key(&path(&["a", "mae"], 1)), "a/mae_loss");
        assert_eq!(loss_key(&path(&["total_loss"], 0)), "total_loss");
    }

    #[test]
    fn test_metric_key_plain_join() {
        assert_eq!(metric_key(&path(&["a", "accuracy"], 1)), "a/accuracy");
    }

    #[test]
    fn test_unique_key_counts_from_one() {
        let taken = ["x".to_string(), "x_1".to_string()];
        let got = unique_key("x".to_string(), |k| taken.iter().any(|t| t == k));
        assert_eq!(got, "x_2");

        let free = unique_key("y".to_string(), |k| taken.iter().any(|t| t == k));
        assert_eq!(free, "y");
    }
}
