//! Claim validators and their error codes.
//!
//! Validators never short-circuit one another. The consumer runs every
//! registered validator, collects each failure as a coded
//! [`ValidationError`], and reports the whole set at once.

use crate::jwt::claims::NumericDate;
use crate::jwt::consumer::JwtContext;

/// Numeric codes carried by [`ValidationError`], stable for programmatic
/// matching.
#[allow(missing_docs)]
pub mod error_codes {
    pub const EXPIRED: i32 = 1;
    pub const ISSUED_AT_INVALID_FUTURE: i32 = 2;
    pub const NOT_YET_VALID: i32 = 3;
    pub const AUDIENCE_INVALID: i32 = 4;
    pub const AUDIENCE_MISSING: i32 = 5;
    pub const ISSUER_INVALID: i32 = 6;
    pub const ISSUER_MISSING: i32 = 7;
    pub const EXPIRATION_MISSING: i32 = 8;
    pub const ISSUED_AT_MISSING: i32 = 9;
    pub const EXPIRATION_TOO_FAR_IN_FUTURE: i32 = 10;
    pub const SUBJECT_MISSING: i32 = 11;
    pub const SUBJECT_INVALID: i32 = 12;
    pub const JWT_ID_MISSING: i32 = 13;
    pub const JWT_ID_INVALID: i32 = 14;
    pub const TYPE_MISSING: i32 = 15;
    pub const TYPE_INVALID: i32 = 16;
    pub const SIGNATURE_MISSING: i32 = 17;
    pub const SIGNATURE_INVALID: i32 = 18;
    pub const INTEGRITY_MISSING: i32 = 19;
    pub const ENCRYPTION_MISSING: i32 = 20;
    pub const NOT_BEFORE_MISSING: i32 = 21;
    pub const ISSUED_AT_INVALID_PAST: i32 = 22;
    pub const MALFORMED_CLAIM: i32 = 23;
    pub const INTEGRITY_FAILURE: i32 = 24;
    pub const MISCELLANEOUS: i32 = -1;
}

/// One reason a JWT was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// A code from [`error_codes`].
    pub code: i32,
    /// Human-readable detail.
    pub message: String,
}

impl ValidationError {
    /// Build an error with a code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// What a validator sees: the fully processed context plus the instant the
/// consumer is evaluating at.
pub struct ValidationContext<'a> {
    /// The processed token: layers and claims.
    pub context: &'a JwtContext,
    /// The instant to validate against; injected for tests, otherwise now.
    pub evaluation_time: NumericDate,
}

/// A claims validator. Return `None` for pass, or a coded error.
pub trait ClaimsValidator: Send + Sync {
    /// Examine the context and report at most one problem.
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError>;
}

impl<F> ClaimsValidator for F
where
    F: Fn(&ValidationContext<'_>) -> Option<ValidationError> + Send + Sync,
{
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        self(ctx)
    }
}

// Shorthand used by the built-in validators: a malformed claim is itself a
// collected failure, not a pipeline abort.
macro_rules! claim_or_malformed {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(ValidationError::new(
                    error_codes::MALFORMED_CLAIM,
                    err.to_string(),
                ))
            }
        }
    };
}

/// `exp`, `nbf` and `iat` enforcement with clock skew.
#[derive(Debug, Clone, Default)]
pub(crate) struct DateValidator {
    pub require_expiration: bool,
    pub require_issued_at: bool,
    pub require_not_before: bool,
    pub skew_seconds: i64,
    pub max_future_validity_seconds: Option<i64>,
    pub issued_at_allowed_seconds_in_future: Option<i64>,
    pub issued_at_allowed_seconds_in_past: Option<i64>,
}

impl ClaimsValidator for DateValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let claims = ctx.context.jwt_claims();
        let now = ctx.evaluation_time;
        let skew = self.skew_seconds;

        let expiration = claim_or_malformed!(claims.expiration_time());
        let not_before = claim_or_malformed!(claims.not_before());
        let issued_at = claim_or_malformed!(claims.issued_at());

        match expiration {
            None if self.require_expiration => {
                return Some(ValidationError::new(
                    error_codes::EXPIRATION_MISSING,
                    "no expiration time (exp) claim present",
                ));
            }
            Some(exp) => {
                // The current time must be strictly before exp, give or
                // take the allowed skew.
                if now.is_on_or_after(exp.plus_seconds(skew)) {
                    return Some(ValidationError::new(
                        error_codes::EXPIRED,
                        format!("the JWT expired at {exp} and it is now {now}"),
                    ));
                }
                if let Some(max_future) = self.max_future_validity_seconds {
                    if exp.minus_seconds(skew).is_on_or_after(now.plus_seconds(max_future + 1)) {
                        return Some(ValidationError::new(
                            error_codes::EXPIRATION_TOO_FAR_IN_FUTURE,
                            format!(
                                "exp {exp} is more than {max_future} seconds in the future"
                            ),
                        ));
                    }
                }
                if let Some(nbf) = not_before {
                    if exp.is_before(nbf) {
                        return Some(ValidationError::new(
                            error_codes::MISCELLANEOUS,
                            format!("exp {exp} cannot be before the nbf {nbf}"),
                        ));
                    }
                }
            }
            None => {}
        }

        match not_before {
            None if self.require_not_before => {
                return Some(ValidationError::new(
                    error_codes::NOT_BEFORE_MISSING,
                    "no not-before (nbf) claim present",
                ));
            }
            Some(nbf) => {
                if now.plus_seconds(skew).is_before(nbf) {
                    return Some(ValidationError::new(
                        error_codes::NOT_YET_VALID,
                        format!("the JWT is not valid before {nbf} and it is now {now}"),
                    ));
                }
            }
            None => {}
        }

        match issued_at {
            None if self.require_issued_at => {
                return Some(ValidationError::new(
                    error_codes::ISSUED_AT_MISSING,
                    "no issued-at (iat) claim present",
                ));
            }
            Some(iat) => {
                if let Some(allowed_future) = self.issued_at_allowed_seconds_in_future {
                    if iat.is_on_or_after(now.plus_seconds(skew + allowed_future + 1)) {
                        return Some(ValidationError::new(
                            error_codes::ISSUED_AT_INVALID_FUTURE,
                            format!("iat {iat} is too far in the future (now {now})"),
                        ));
                    }
                }
                if let Some(allowed_past) = self.issued_at_allowed_seconds_in_past {
                    if now.minus_seconds(skew + allowed_past).is_on_or_after(iat.plus_seconds(1)) {
                        return Some(ValidationError::new(
                            error_codes::ISSUED_AT_INVALID_PAST,
                            format!("iat {iat} is too far in the past (now {now})"),
                        ));
                    }
                }
            }
            None => {}
        }

        None
    }
}

/// `iss` membership in an allowed set.
#[derive(Debug, Clone, Default)]
pub(crate) struct IssuerValidator {
    pub expected: Option<Vec<String>>,
    pub require: bool,
}

impl ClaimsValidator for IssuerValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let issuer = claim_or_malformed!(ctx.context.jwt_claims().issuer());
        match (issuer, &self.expected) {
            (None, _) if self.require => Some(ValidationError::new(
                error_codes::ISSUER_MISSING,
                "no issuer (iss) claim present",
            )),
            (Some(issuer), Some(expected)) if !expected.iter().any(|e| e == issuer) => {
                Some(ValidationError::new(
                    error_codes::ISSUER_INVALID,
                    format!("issuer {issuer:?} is not an expected issuer"),
                ))
            }
            _ => None,
        }
    }
}

/// `aud` intersection with the allowed set.
///
/// RFC 7519 requires rejecting any token carrying an audience the consumer
/// does not identify with, so a present `aud` with no expectation
/// configured is a failure, not a pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct AudienceValidator {
    pub expected: Vec<String>,
    pub require: bool,
    pub configured: bool,
}

impl ClaimsValidator for AudienceValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let has_claim = ctx.context.jwt_claims().has_claim("aud");
        let audiences = claim_or_malformed!(ctx.context.jwt_claims().audiences());

        if !has_claim {
            if self.require {
                return Some(ValidationError::new(
                    error_codes::AUDIENCE_MISSING,
                    "no audience (aud) claim present",
                ));
            }
            return None;
        }
        if !self.configured {
            return Some(ValidationError::new(
                error_codes::AUDIENCE_INVALID,
                "audience (aud) claim present but no expected audience configured",
            ));
        }
        if audiences.iter().any(|aud| self.expected.contains(aud)) {
            None
        } else {
            Some(ValidationError::new(
                error_codes::AUDIENCE_INVALID,
                format!("audience {audiences:?} does not include an expected audience"),
            ))
        }
    }
}

/// `sub` presence and optional exact match.
#[derive(Debug, Clone, Default)]
pub(crate) struct SubjectValidator {
    pub expected: Option<String>,
    pub require: bool,
}

impl ClaimsValidator for SubjectValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let subject = claim_or_malformed!(ctx.context.jwt_claims().subject());
        match (subject, &self.expected) {
            (None, _) if self.require || self.expected.is_some() => Some(ValidationError::new(
                error_codes::SUBJECT_MISSING,
                "no subject (sub) claim present",
            )),
            (Some(subject), Some(expected)) if subject != expected => {
                Some(ValidationError::new(
                    error_codes::SUBJECT_INVALID,
                    format!("subject {subject:?} does not match {expected:?}"),
                ))
            }
            _ => None,
        }
    }
}

/// `jti` presence.
#[derive(Debug, Clone, Default)]
pub(crate) struct JwtIdValidator {
    pub require: bool,
}

impl ClaimsValidator for JwtIdValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let jti = claim_or_malformed!(ctx.context.jwt_claims().jwt_id());
        if jti.is_none() && self.require {
            return Some(ValidationError::new(
                error_codes::JWT_ID_MISSING,
                "no JWT ID (jti) claim present",
            ));
        }
        None
    }
}

/// `typ` header of the innermost JOSE layer, with `application/` prefix
/// normalization per RFC 8725.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeValidator {
    pub expected: Option<String>,
    pub require: bool,
}

impl ClaimsValidator for TypeValidator {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Option<ValidationError> {
        let Some(expected) = &self.expected else {
            return None;
        };
        let typ = ctx
            .context
            .jose_objects()
            .first()
            .and_then(|inner| inner.headers().string_value("typ"));
        match typ {
            None if self.require => Some(ValidationError::new(
                error_codes::TYPE_MISSING,
                "no typ header present on the innermost JOSE object",
            )),
            Some(typ) if !media_type_matches(expected, typ) => Some(ValidationError::new(
                error_codes::TYPE_INVALID,
                format!("typ header {typ:?} does not match expected {expected:?}"),
            )),
            _ => None,
        }
    }
}

/// Case-insensitive media-type comparison, with an optional `application/`
/// prefix on either side.
pub(crate) fn media_type_matches(expected: &str, actual: &str) -> bool {
    fn normalize(value: &str) -> String {
        let value = value.trim().to_ascii_lowercase();
        value
            .strip_prefix("application/")
            .map(str::to_owned)
            .unwrap_or(value)
    }
    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn media_type_normalization() {
        assert!(media_type_matches("JWT", "jwt"));
        assert!(media_type_matches("JWT", "application/JWT"));
        assert!(media_type_matches("application/jwt", "JWT"));
        assert!(!media_type_matches("JWT", "application/jose"));
        assert!(!media_type_matches("secevent+jwt", "jwt"));
    }
}
