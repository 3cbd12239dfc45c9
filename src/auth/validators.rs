//! Request validators for the login endpoints

use super::models::{CallbackParams, ExchangeRequest};
use crate::common::validation::require_opaque;
use crate::common::{ValidationResult, Validator};

const MAX_CALLBACK_PARAM_LEN: usize = 2048;
const MAX_EXCHANGE_CODE_LEN: usize = 512;

/// Validates the `code`/`state` pair on the provider callback
pub struct CallbackValidator;

impl Validator<CallbackParams> for CallbackValidator {
    fn validate(&self, data: &CallbackParams) -> ValidationResult {
        let mut result = ValidationResult::new();
        require_opaque(&mut result, "code", data.code.as_deref(), MAX_CALLBACK_PARAM_LEN);
        require_opaque(&mut result, "state", data.state.as_deref(), MAX_CALLBACK_PARAM_LEN);
        result
    }
}

pub struct ExchangeValidator;

impl Validator<ExchangeRequest> for ExchangeValidator {
    fn validate(&self, data: &ExchangeRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require_opaque(&mut result, "code", Some(&data.code), MAX_EXCHANGE_CODE_LEN);
        result
    }
}
