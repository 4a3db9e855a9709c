use crate::error::{Error, Result};

/// Label name carrying the bucket bound of histogram samples.
pub const BUCKET_LABEL: &str = "le";

pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

pub fn validate_label_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidLabel {
            name: name.to_string(),
            reason,
        })
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return invalid("label name is empty"),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            return invalid("label name must start with a letter or `_`");
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("label name may only contain [a-zA-Z0-9_]");
    }
    if name.starts_with("__") {
        return invalid("label names starting with `__` are reserved");
    }
    Ok(())
}
