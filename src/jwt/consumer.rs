//! The JWT consumer pipeline.
//!
//! A [`JwtConsumer`] is configured once through [`JwtConsumerBuilder`] and
//! then reused; it is immutable and safe to share across threads. Processing
//! walks the compact string outside-in: classify the layer as JWS or JWE,
//! resolve a key, enforce the algorithm constraints and `crit`, verify or
//! decrypt, and recurse while the content type declares another JOSE object
//! inside. The innermost payload is parsed as claims and every registered
//! validator runs; nothing short-circuits, and all failures come back
//! together in one [`InvalidJwtError`].
//!
//! Two-pass processing splits the work when the keys depend on the claims:
//! a first consumer built with
//! [`set_skip_signature_verification`](JwtConsumerBuilder::set_skip_signature_verification)
//! and [`set_skip_all_validators`](JwtConsumerBuilder::set_skip_all_validators)
//! surfaces the claims cheaply, then a fully configured consumer re-runs
//! verification over the same parsed layers with
//! [`process_context`](JwtConsumer::process_context), without reparsing.

use rand_core::OsRng;

use crate::error::Error;
use crate::headers::check_critical_headers;
use crate::jose::JoseObject;
use crate::jwa::{AlgorithmConstraints, KeyPersuasion, SignatureAlgorithm};
use crate::jwe::JsonWebEncryption;
use crate::jwk::Key;
use crate::jws::JsonWebSignature;
use crate::jwt::claims::{JwtClaims, NumericDate};
use crate::jwt::validators::{
    error_codes, media_type_matches, AudienceValidator, ClaimsValidator, DateValidator,
    IssuerValidator, JwtIdValidator, SubjectValidator, TypeValidator, ValidationContext,
    ValidationError,
};

/// Resolves the verification key for a JWS layer.
///
/// The resolver sees the parsed JWS and the already-processed outer layers,
/// immediately-enclosing first, so `kid`-based and JWK-set-based resolution
/// need no side state.
pub trait VerificationKeyResolver: Send + Sync {
    /// Choose a key for the given JWS.
    fn resolve(&self, jws: &JsonWebSignature, nesting: &[JoseObject]) -> Result<Key, Error>;
}

impl<F> VerificationKeyResolver for F
where
    F: Fn(&JsonWebSignature, &[JoseObject]) -> Result<Key, Error> + Send + Sync,
{
    fn resolve(&self, jws: &JsonWebSignature, nesting: &[JoseObject]) -> Result<Key, Error> {
        self(jws, nesting)
    }
}

/// Resolves the decryption key for a JWE layer.
pub trait DecryptionKeyResolver: Send + Sync {
    /// Choose a key for the given JWE.
    fn resolve(&self, jwe: &JsonWebEncryption, nesting: &[JoseObject]) -> Result<Key, Error>;
}

impl<F> DecryptionKeyResolver for F
where
    F: Fn(&JsonWebEncryption, &[JoseObject]) -> Result<Key, Error> + Send + Sync,
{
    fn resolve(&self, jwe: &JsonWebEncryption, nesting: &[JoseObject]) -> Result<Key, Error> {
        self(jwe, nesting)
    }
}

struct FixedVerificationKey(Key);

impl VerificationKeyResolver for FixedVerificationKey {
    fn resolve(&self, _: &JsonWebSignature, _: &[JoseObject]) -> Result<Key, Error> {
        Ok(self.0.clone())
    }
}

struct FixedDecryptionKey(Key);

impl DecryptionKeyResolver for FixedDecryptionKey {
    fn resolve(&self, _: &JsonWebEncryption, _: &[JoseObject]) -> Result<Key, Error> {
        Ok(self.0.clone())
    }
}

/// The fully processed token: every JOSE layer plus the decoded claims.
///
/// Layers are ordered innermost first, outermost last.
#[derive(Debug)]
pub struct JwtContext {
    jwt: String,
    jose_objects: Vec<JoseObject>,
    jwt_claims: JwtClaims,
}

impl JwtContext {
    /// The original compact string.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The JOSE layers, innermost first.
    pub fn jose_objects(&self) -> &[JoseObject] {
        &self.jose_objects
    }

    /// The innermost decoded claims.
    pub fn jwt_claims(&self) -> &JwtClaims {
        &self.jwt_claims
    }

    /// Take ownership of the claims.
    pub fn into_jwt_claims(self) -> JwtClaims {
        self.jwt_claims
    }
}

/// The aggregate rejection: every reason the token failed, with codes.
#[derive(Debug)]
pub struct InvalidJwtError {
    message: String,
    details: Vec<ValidationError>,
}

impl InvalidJwtError {
    fn new(message: impl Into<String>, details: Vec<ValidationError>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    /// Every collected failure.
    pub fn error_details(&self) -> &[ValidationError] {
        &self.details
    }

    /// Whether any failure carries the given [`error_codes`] value.
    pub fn has_error_code(&self, code: i32) -> bool {
        self.details.iter().any(|detail| detail.code == code)
    }

    /// Whether the token was rejected (at least in part) for being expired.
    pub fn is_expired(&self) -> bool {
        self.has_error_code(error_codes::EXPIRED)
    }
}

impl std::fmt::Display for InvalidJwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid JWT: {}", self.message)?;
        if !self.details.is_empty() {
            let reasons: Vec<String> = self.details.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", reasons.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidJwtError {}

/// Builder for [`JwtConsumer`].
pub struct JwtConsumerBuilder {
    verification_key_resolver: Option<Box<dyn VerificationKeyResolver>>,
    decryption_key_resolver: Option<Box<dyn DecryptionKeyResolver>>,
    jws_algorithm_constraints: Option<AlgorithmConstraints>,
    jwe_algorithm_constraints: Option<AlgorithmConstraints>,
    jwe_content_encryption_algorithm_constraints: Option<AlgorithmConstraints>,
    require_signature: bool,
    require_encryption: bool,
    require_integrity: bool,
    skip_signature_verification: bool,
    skip_all_validators: bool,
    skip_all_default_validators: bool,
    liberal_content_type_handling: bool,
    relax_verification_key_validation: bool,
    relax_decryption_key_validation: bool,
    known_critical_headers: Vec<String>,
    evaluation_time: Option<NumericDate>,
    allowed_clock_skew_seconds: i64,
    date_validator: DateValidator,
    issuer_validator: IssuerValidator,
    audience_validator: AudienceValidator,
    subject_validator: SubjectValidator,
    jwt_id_validator: JwtIdValidator,
    type_validator: TypeValidator,
    custom_validators: Vec<Box<dyn ClaimsValidator>>,
}

impl Default for JwtConsumerBuilder {
    fn default() -> Self {
        Self {
            verification_key_resolver: None,
            decryption_key_resolver: None,
            jws_algorithm_constraints: None,
            jwe_algorithm_constraints: None,
            jwe_content_encryption_algorithm_constraints: None,
            require_signature: true,
            require_encryption: false,
            require_integrity: false,
            skip_signature_verification: false,
            skip_all_validators: false,
            skip_all_default_validators: false,
            liberal_content_type_handling: false,
            relax_verification_key_validation: false,
            relax_decryption_key_validation: false,
            known_critical_headers: Vec::new(),
            evaluation_time: None,
            allowed_clock_skew_seconds: 0,
            date_validator: DateValidator::default(),
            issuer_validator: IssuerValidator::default(),
            audience_validator: AudienceValidator::default(),
            subject_validator: SubjectValidator::default(),
            jwt_id_validator: JwtIdValidator::default(),
            type_validator: TypeValidator::default(),
            custom_validators: Vec::new(),
        }
    }
}

impl JwtConsumerBuilder {
    /// Start from the defaults: a signature is required, `none` is blocked,
    /// RSA1_5 and PBES2 are blocked, and no claims are expected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one fixed verification key for every JWS layer.
    pub fn set_verification_key(mut self, key: Key) -> Self {
        self.verification_key_resolver = Some(Box::new(FixedVerificationKey(key)));
        self
    }

    /// Use a callback to resolve verification keys.
    pub fn set_verification_key_resolver(
        mut self,
        resolver: impl VerificationKeyResolver + 'static,
    ) -> Self {
        self.verification_key_resolver = Some(Box::new(resolver));
        self
    }

    /// Use one fixed decryption key for every JWE layer.
    pub fn set_decryption_key(mut self, key: Key) -> Self {
        self.decryption_key_resolver = Some(Box::new(FixedDecryptionKey(key)));
        self
    }

    /// Use a callback to resolve decryption keys.
    pub fn set_decryption_key_resolver(
        mut self,
        resolver: impl DecryptionKeyResolver + 'static,
    ) -> Self {
        self.decryption_key_resolver = Some(Box::new(resolver));
        self
    }

    /// Constrain acceptable JWS `alg` values beyond the default `none` ban.
    pub fn set_jws_algorithm_constraints(mut self, constraints: AlgorithmConstraints) -> Self {
        self.jws_algorithm_constraints = Some(constraints);
        self
    }

    /// Constrain acceptable JWE `alg` values, replacing the default block
    /// on RSA1_5 and PBES2.
    pub fn set_jwe_algorithm_constraints(mut self, constraints: AlgorithmConstraints) -> Self {
        self.jwe_algorithm_constraints = Some(constraints);
        self
    }

    /// Constrain acceptable JWE `enc` values.
    pub fn set_jwe_content_encryption_algorithm_constraints(
        mut self,
        constraints: AlgorithmConstraints,
    ) -> Self {
        self.jwe_content_encryption_algorithm_constraints = Some(constraints);
        self
    }

    /// Accept tokens without a signature.
    pub fn set_disable_require_signature(mut self) -> Self {
        self.require_signature = false;
        self
    }

    /// Reject tokens that were not encrypted.
    pub fn set_enable_require_encryption(mut self) -> Self {
        self.require_encryption = true;
        self
    }

    /// Reject tokens whose only protection is asymmetric encryption, which
    /// anyone could have produced.
    pub fn set_enable_require_integrity(mut self) -> Self {
        self.require_integrity = true;
        self
    }

    /// First-pass mode: parse and decrypt but do not verify signatures.
    pub fn set_skip_signature_verification(mut self) -> Self {
        self.skip_signature_verification = true;
        self
    }

    /// Run no validators at all.
    pub fn set_skip_all_validators(mut self) -> Self {
        self.skip_all_validators = true;
        self
    }

    /// Run only the caller-registered validators.
    pub fn set_skip_all_default_validators(mut self) -> Self {
        self.skip_all_default_validators = true;
        self
    }

    /// When the innermost payload is not JSON, try it as a nested JOSE
    /// object even without a `cty` header.
    pub fn set_enable_liberal_content_type_handling(mut self) -> Self {
        self.liberal_content_type_handling = true;
        self
    }

    /// Skip key-to-algorithm validation on JWS layers.
    pub fn set_relax_verification_key_validation(mut self) -> Self {
        self.relax_verification_key_validation = true;
        self
    }

    /// Skip key-to-algorithm validation on JWE layers.
    pub fn set_relax_decryption_key_validation(mut self) -> Self {
        self.relax_decryption_key_validation = true;
        self
    }

    /// Declare `crit` header names the application understands.
    pub fn set_known_critical_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_critical_headers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Validate date claims against a fixed instant instead of now.
    pub fn set_evaluation_time(mut self, time: NumericDate) -> Self {
        self.evaluation_time = Some(time);
        self
    }

    /// Allow this much clock skew in date-claim comparisons.
    pub fn set_allowed_clock_skew_seconds(mut self, seconds: i64) -> Self {
        self.allowed_clock_skew_seconds = seconds;
        self
    }

    /// Require the `exp` claim.
    pub fn set_require_expiration_time(mut self) -> Self {
        self.date_validator.require_expiration = true;
        self
    }

    /// Require the `iat` claim.
    pub fn set_require_issued_at(mut self) -> Self {
        self.date_validator.require_issued_at = true;
        self
    }

    /// Require the `nbf` claim.
    pub fn set_require_not_before(mut self) -> Self {
        self.date_validator.require_not_before = true;
        self
    }

    /// Reject `exp` values further than this in the future.
    pub fn set_max_future_validity_minutes(mut self, minutes: i64) -> Self {
        self.date_validator.max_future_validity_seconds = Some(minutes * 60);
        self
    }

    /// Bound `iat`: at most this far in the future and this far in the
    /// past, in seconds.
    pub fn set_issued_at_restrictions(
        mut self,
        allowed_seconds_in_future: i64,
        allowed_seconds_in_past: i64,
    ) -> Self {
        self.date_validator.issued_at_allowed_seconds_in_future = Some(allowed_seconds_in_future);
        self.date_validator.issued_at_allowed_seconds_in_past = Some(allowed_seconds_in_past);
        self
    }

    /// Expect this exact issuer.
    pub fn set_expected_issuer(self, require: bool, issuer: &str) -> Self {
        self.set_expected_issuers(require, [issuer])
    }

    /// Expect the issuer to be one of this set.
    pub fn set_expected_issuers<I, S>(mut self, require: bool, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issuer_validator.require = require;
        self.issuer_validator.expected = Some(issuers.into_iter().map(Into::into).collect());
        self
    }

    /// Require the `iss` claim without constraining its value.
    pub fn set_require_issuer(mut self) -> Self {
        self.issuer_validator.require = true;
        self
    }

    /// Expect at least one of these audiences.
    pub fn set_expected_audience<I, S>(mut self, require: bool, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience_validator.require = require;
        self.audience_validator.expected = audiences.into_iter().map(Into::into).collect();
        self.audience_validator.configured = true;
        self
    }

    /// Expect this exact subject.
    pub fn set_expected_subject(mut self, subject: &str) -> Self {
        self.subject_validator.expected = Some(subject.to_owned());
        self
    }

    /// Require the `sub` claim without constraining its value.
    pub fn set_require_subject(mut self) -> Self {
        self.subject_validator.require = true;
        self
    }

    /// Require the `jti` claim.
    pub fn set_require_jwt_id(mut self) -> Self {
        self.jwt_id_validator.require = true;
        self
    }

    /// Expect this `typ` header on the innermost JOSE object.
    pub fn set_expected_type(mut self, require: bool, expected_type: &str) -> Self {
        self.type_validator.require = require;
        self.type_validator.expected = Some(expected_type.to_owned());
        self
    }

    /// Register an additional validator, run after the built-in ones.
    pub fn register_validator(mut self, validator: impl ClaimsValidator + 'static) -> Self {
        self.custom_validators.push(Box::new(validator));
        self
    }

    /// Finish the consumer.
    pub fn build(mut self) -> JwtConsumer {
        self.date_validator.skew_seconds = self.allowed_clock_skew_seconds;

        let mut validators: Vec<Box<dyn ClaimsValidator>> = Vec::new();
        if !self.skip_all_validators {
            if !self.skip_all_default_validators {
                validators.push(Box::new(self.date_validator.clone()));
                validators.push(Box::new(self.issuer_validator.clone()));
                validators.push(Box::new(self.audience_validator.clone()));
                validators.push(Box::new(self.subject_validator.clone()));
                validators.push(Box::new(self.jwt_id_validator.clone()));
                validators.push(Box::new(self.type_validator.clone()));
            }
            validators.extend(self.custom_validators);
        }

        JwtConsumer {
            verification_key_resolver: self.verification_key_resolver,
            decryption_key_resolver: self.decryption_key_resolver,
            jws_algorithm_constraints: self.jws_algorithm_constraints,
            jwe_algorithm_constraints: self.jwe_algorithm_constraints,
            jwe_content_encryption_algorithm_constraints: self
                .jwe_content_encryption_algorithm_constraints,
            require_signature: self.require_signature,
            require_encryption: self.require_encryption,
            require_integrity: self.require_integrity,
            skip_signature_verification: self.skip_signature_verification,
            liberal_content_type_handling: self.liberal_content_type_handling,
            relax_verification_key_validation: self.relax_verification_key_validation,
            relax_decryption_key_validation: self.relax_decryption_key_validation,
            known_critical_headers: self.known_critical_headers,
            evaluation_time: self.evaluation_time,
            validators,
        }
    }
}

/// A reusable, thread-safe JWT processor. See the module docs.
pub struct JwtConsumer {
    verification_key_resolver: Option<Box<dyn VerificationKeyResolver>>,
    decryption_key_resolver: Option<Box<dyn DecryptionKeyResolver>>,
    jws_algorithm_constraints: Option<AlgorithmConstraints>,
    jwe_algorithm_constraints: Option<AlgorithmConstraints>,
    jwe_content_encryption_algorithm_constraints: Option<AlgorithmConstraints>,
    require_signature: bool,
    require_encryption: bool,
    require_integrity: bool,
    skip_signature_verification: bool,
    liberal_content_type_handling: bool,
    relax_verification_key_validation: bool,
    relax_decryption_key_validation: bool,
    known_critical_headers: Vec<String>,
    evaluation_time: Option<NumericDate>,
    validators: Vec<Box<dyn ClaimsValidator>>,
}

impl JwtConsumer {
    /// Process a compact JWT end to end.
    pub fn process(&self, jwt: &str) -> Result<JwtContext, InvalidJwtError> {
        let context = self.build_context(jwt)?;
        self.validate(&context)?;
        Ok(context)
    }

    /// Process and return only the claims.
    pub fn process_to_claims(&self, jwt: &str) -> Result<JwtClaims, InvalidJwtError> {
        self.process(jwt).map(JwtContext::into_jwt_claims)
    }

    /// Second-pass processing: re-verify every already-parsed layer with
    /// this consumer's keys and constraints, then run the validators. No
    /// reparsing happens.
    pub fn process_context(&self, context: &mut JwtContext) -> Result<(), InvalidJwtError> {
        for index in (0..context.jose_objects.len()).rev() {
            let (inner, outer) = context.jose_objects.split_at_mut(index + 1);
            self.process_layer(&mut inner[index], outer)
                .map_err(|detail| {
                    InvalidJwtError::new("unable to process the JOSE object", vec![detail])
                })?;
        }
        self.validate(context)
    }

    fn build_context(&self, jwt: &str) -> Result<JwtContext, InvalidJwtError> {
        let mut jose_objects: Vec<JoseObject> = Vec::new();
        let mut working = jwt.to_owned();

        let jwt_claims = loop {
            let mut jose = JoseObject::from_compact_serialization(&working).map_err(|err| {
                InvalidJwtError::new("unable to parse the JOSE object", vec![layer_error(err)])
            })?;
            self.process_layer(&mut jose, &jose_objects)
                .map_err(|detail| {
                    InvalidJwtError::new("unable to process the JOSE object", vec![detail])
                })?;

            let content = jose
                .inner_content()
                .map_err(|err| {
                    InvalidJwtError::new("no content recovered", vec![layer_error(err)])
                })?
                .to_vec();
            jose_objects.insert(0, jose);

            let content = String::from_utf8(content).map_err(|_| {
                InvalidJwtError::new(
                    "inner content is not UTF-8",
                    vec![ValidationError::new(
                        error_codes::MISCELLANEOUS,
                        "inner content is not UTF-8",
                    )],
                )
            })?;

            let declares_nested = jose_objects[0]
                .content_type()
                .map(|cty| media_type_matches("JWT", cty))
                .unwrap_or(false);
            if declares_nested {
                working = content;
                continue;
            }

            match JwtClaims::from_json(&content) {
                Ok(claims) => break claims,
                Err(err) => {
                    // Some producers nest without setting cty; optionally
                    // try the payload as another JOSE object before giving
                    // up on it.
                    if self.liberal_content_type_handling
                        && JoseObject::from_compact_serialization(&content).is_ok()
                    {
                        working = content;
                        continue;
                    }
                    return Err(InvalidJwtError::new(
                        "unable to parse the JWT claims",
                        vec![ValidationError::new(
                            error_codes::MALFORMED_CLAIM,
                            err.to_string(),
                        )],
                    ));
                }
            }
        };

        Ok(JwtContext {
            jwt: jwt.to_owned(),
            jose_objects,
            jwt_claims,
        })
    }

    fn process_layer(
        &self,
        layer: &mut JoseObject,
        nesting: &[JoseObject],
    ) -> Result<(), ValidationError> {
        match layer {
            JoseObject::Signature(jws) => {
                if let Some(constraints) = &self.jws_algorithm_constraints {
                    jws.set_algorithm_constraints(constraints.clone());
                }
                jws.set_known_critical_headers(self.known_critical_headers.iter().cloned());
                if self.relax_verification_key_validation {
                    jws.set_do_key_validation(false);
                }

                if self.skip_signature_verification {
                    return check_critical_headers(jws.headers(), &self.known_critical_headers)
                        .map_err(layer_error);
                }

                // An unsecured JWS has no key to resolve; whether it is
                // acceptable at all is the constraint check's call.
                let key = if jws.headers().string_value("alg") == Some("none") {
                    Key::from_oct(&[])
                } else {
                    let resolver = self.verification_key_resolver.as_ref().ok_or_else(|| {
                        ValidationError::new(
                            error_codes::MISCELLANEOUS,
                            "no verification key or key resolver configured",
                        )
                    })?;
                    resolver.resolve(jws, nesting).map_err(layer_error)?
                };
                match jws.verify_signature(&key) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(ValidationError::new(
                        error_codes::SIGNATURE_INVALID,
                        format!(
                            "signature verification failed for JWS (alg={})",
                            jws.headers().string_value("alg").unwrap_or("?")
                        ),
                    )),
                    Err(err) => Err(layer_error(err)),
                }
            }
            JoseObject::Encryption(jwe) => {
                if let Some(constraints) = &self.jwe_algorithm_constraints {
                    jwe.set_algorithm_constraints(constraints.clone());
                }
                if let Some(constraints) = &self.jwe_content_encryption_algorithm_constraints {
                    jwe.set_content_encryption_algorithm_constraints(constraints.clone());
                }
                jwe.set_known_critical_headers(self.known_critical_headers.iter().cloned());
                if self.relax_decryption_key_validation {
                    jwe.set_do_key_validation(false);
                }

                let resolver = self.decryption_key_resolver.as_ref().ok_or_else(|| {
                    ValidationError::new(
                        error_codes::MISCELLANEOUS,
                        "no decryption key or key resolver configured",
                    )
                })?;
                let key = resolver.resolve(jwe, nesting).map_err(layer_error)?;
                jwe.decrypt(&key, &mut OsRng)
                    .map(drop)
                    .map_err(layer_error)
            }
        }
    }

    fn validate(&self, context: &JwtContext) -> Result<(), InvalidJwtError> {
        let mut details = Vec::new();

        if self.require_signature && !has_signature(&context.jose_objects) {
            details.push(ValidationError::new(
                error_codes::SIGNATURE_MISSING,
                "the JWT has no signature",
            ));
        }
        if self.require_encryption && !has_encryption(&context.jose_objects) {
            details.push(ValidationError::new(
                error_codes::ENCRYPTION_MISSING,
                "the JWT is not encrypted",
            ));
        }
        if self.require_integrity
            && !has_signature(&context.jose_objects)
            && !has_symmetric_encryption(&context.jose_objects)
        {
            details.push(ValidationError::new(
                error_codes::INTEGRITY_MISSING,
                "the JWT has no integrity protection: no signature and no symmetric-keyed \
                 encryption",
            ));
        }

        let ctx = ValidationContext {
            context,
            evaluation_time: self.evaluation_time.unwrap_or_else(NumericDate::now),
        };
        for validator in &self.validators {
            if let Some(detail) = validator.validate(&ctx) {
                details.push(detail);
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(InvalidJwtError::new(
                "JWT processing failed",
                details,
            ))
        }
    }
}

fn layer_error(err: Error) -> ValidationError {
    match err {
        Error::IntegrityFailure => ValidationError::new(
            error_codes::INTEGRITY_FAILURE,
            "authenticated decryption failed",
        ),
        Error::SignatureInvalid => {
            ValidationError::new(error_codes::SIGNATURE_INVALID, "the signature is invalid")
        }
        other => ValidationError::new(error_codes::MISCELLANEOUS, other.to_string()),
    }
}

fn has_signature(objects: &[JoseObject]) -> bool {
    objects.iter().any(|object| match object {
        JoseObject::Signature(jws) => !matches!(
            jws.algorithm(),
            Ok(SignatureAlgorithm::None) | Err(_)
        ),
        JoseObject::Encryption(_) => false,
    })
}

fn has_encryption(objects: &[JoseObject]) -> bool {
    objects
        .iter()
        .any(|object| matches!(object, JoseObject::Encryption(_)))
}

fn has_symmetric_encryption(objects: &[JoseObject]) -> bool {
    objects.iter().any(|object| match object {
        JoseObject::Encryption(jwe) => jwe
            .algorithm()
            .map(|alg| alg.key_persuasion() == KeyPersuasion::Symmetric)
            .unwrap_or(false),
        JoseObject::Signature(_) => false,
    })
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;
    use serde_json::json;

    use super::*;
    use crate::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm};
    use crate::jwt::claims::JwtClaims;

    fn hs256_key() -> Key {
        // 32 octets, the floor for HS256.
        Key::from_oct(b"a-key-of-exactly-32-octets-long!")
    }

    fn signed_jwt(claims: &JwtClaims) -> String {
        let mut jws = crate::jws::JsonWebSignature::new();
        jws.set_algorithm(crate::jwa::SignatureAlgorithm::Hs256);
        jws.set_payload(&claims.to_json());
        jws.sign(&hs256_key(), &mut OsRng).unwrap()
    }

    #[test]
    fn happy_path() {
        let mut claims = JwtClaims::new();
        claims.set_issuer("issuer.example");
        claims.set_audience("audience.example");
        claims.set_expiration_time(NumericDate::from_seconds(1_300_819_380));
        claims.set_subject("subject");
        let jwt = signed_jwt(&claims);

        let consumer = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .set_expected_issuer(true, "issuer.example")
            .set_expected_audience(true, ["audience.example"])
            .set_require_expiration_time()
            .set_evaluation_time(NumericDate::from_seconds(1_300_819_300))
            .build();

        let context = consumer.process(&jwt).unwrap();
        assert_eq!(context.jwt_claims().subject().unwrap(), Some("subject"));
        assert_eq!(context.jose_objects().len(), 1);
    }

    #[test]
    fn all_failures_are_collected() {
        let mut claims = JwtClaims::new();
        claims.set_issuer("rogue.example");
        claims.set_audience("nobody.example");
        claims.set_expiration_time(NumericDate::from_seconds(1_300_819_380));
        let jwt = signed_jwt(&claims);

        let consumer = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .set_expected_issuer(true, "issuer.example")
            .set_expected_audience(true, ["audience.example"])
            .set_evaluation_time(NumericDate::from_seconds(1_300_819_381))
            .build();

        let err = consumer.process(&jwt).unwrap_err();
        assert!(err.is_expired());
        assert!(err.has_error_code(error_codes::ISSUER_INVALID));
        assert!(err.has_error_code(error_codes::AUDIENCE_INVALID));
        assert_eq!(err.error_details().len(), 3);
    }

    #[test]
    fn unexpected_audience_is_rejected() {
        let mut claims = JwtClaims::new();
        claims.set_audience("someone.example");
        claims.set_expiration_time(NumericDate::from_seconds(2_000_000_000));
        let jwt = signed_jwt(&claims);

        let consumer = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .set_evaluation_time(NumericDate::from_seconds(1_300_000_000))
            .build();

        let err = consumer.process(&jwt).unwrap_err();
        assert!(err.has_error_code(error_codes::AUDIENCE_INVALID));
    }

    #[test]
    fn signature_required_by_default() {
        // An encrypted-only JWT (dir + AES-GCM) fails without
        // set_disable_require_signature.
        let mut claims = JwtClaims::new();
        claims.set_subject("s");
        let key = Key::from_oct(&[0x51u8; 32]);
        let mut jwe = crate::jwe::JsonWebEncryption::new();
        jwe.set_algorithm(KeyManagementAlgorithm::Direct);
        jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A256Gcm);
        jwe.set_plaintext_string(&claims.to_json());
        let jwt = jwe.encrypt(&key, &mut OsRng).unwrap();

        let consumer = JwtConsumerBuilder::new()
            .set_decryption_key(key.clone())
            .build();
        let err = consumer.process(&jwt).unwrap_err();
        assert!(err.has_error_code(error_codes::SIGNATURE_MISSING));

        let relaxed = JwtConsumerBuilder::new()
            .set_decryption_key(key)
            .set_disable_require_signature()
            .build();
        let context = relaxed.process(&jwt).unwrap();
        assert_eq!(context.jwt_claims().subject().unwrap(), Some("s"));
    }

    #[test]
    fn tampered_signature_fails_with_signature_invalid() {
        let mut claims = JwtClaims::new();
        claims.set_subject("s");
        let jwt = signed_jwt(&claims);
        let replacement = if jwt.ends_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}{replacement}", &jwt[..jwt.len() - 1]);

        let consumer = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .build();
        let err = consumer.process(&tampered).unwrap_err();
        assert!(
            err.has_error_code(error_codes::SIGNATURE_INVALID)
                || err.has_error_code(error_codes::MISCELLANEOUS)
        );
    }

    #[test]
    fn two_pass_processing() {
        let mut claims = JwtClaims::new();
        claims.set_issuer("first-pass.example");
        let jwt = signed_jwt(&claims);

        let first_pass = JwtConsumerBuilder::new()
            .set_skip_all_validators()
            .set_disable_require_signature()
            .set_skip_signature_verification()
            .build();
        let mut context = first_pass.process(&jwt).unwrap();
        assert_eq!(
            context.jwt_claims().issuer().unwrap(),
            Some("first-pass.example")
        );

        // Key selection based on the first-pass issuer, then a full
        // second pass over the same context.
        let second_pass = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .set_expected_issuer(true, "first-pass.example")
            .build();
        second_pass.process_context(&mut context).unwrap();

        let wrong_key = JwtConsumerBuilder::new()
            .set_verification_key(Key::from_oct(&[7u8; 32]))
            .build();
        assert!(wrong_key.process_context(&mut context).is_err());
    }

    #[test]
    fn custom_validator_runs() {
        let mut claims = JwtClaims::new();
        claims.set_claim("role", json!("intern"));
        let jwt = signed_jwt(&claims);

        let consumer = JwtConsumerBuilder::new()
            .set_verification_key(hs256_key())
            .register_validator(|ctx: &ValidationContext<'_>| {
                match ctx.context.jwt_claims().claim_value("role") {
                    Some(role) if role == "admin" => None,
                    _ => Some(ValidationError::new(
                        error_codes::MISCELLANEOUS,
                        "role must be admin",
                    )),
                }
            })
            .build();

        let err = consumer.process(&jwt).unwrap_err();
        assert!(err
            .error_details()
            .iter()
            .any(|d| d.message.contains("role must be admin")));
    }
}
