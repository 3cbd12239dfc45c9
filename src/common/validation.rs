// Common validation types and traits

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Converts into `Err` when any error was recorded
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

/// Records an error unless `value` is present, non-blank and at most `max_len` bytes
pub fn require_opaque(result: &mut ValidationResult, field: &str, value: Option<&str>, max_len: usize) {
    match value.map(str::trim) {
        None | Some("") => result.add_error(field, "is required"),
        Some(v) if v.len() > max_len => {
            result.add_error(field, &format!("must be at most {} characters", max_len))
        }
        Some(_) => {}
    }
}
