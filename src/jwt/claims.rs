//! JWT claims ([RFC 7519][RFC7519] section 4).
//!
//! [`JwtClaims`] is an ordered map of claim names to JSON values with typed
//! views over the registered claims. The typed accessors are strict: a
//! present claim of the wrong shape is [`Error::MalformedClaim`], never
//! silently `None`, so validators cannot be dodged by retyping a claim.
//!
//! [RFC7519]: https://tools.ietf.org/html/rfc7519

use rand_core::{CryptoRngCore, OsRng};
use serde_json::{Map, Value};

use crate::base64;
use crate::error::Error;

/// Seconds since the epoch, the JWT NumericDate representation.
///
/// The accepted range is bounded well inside `i64` so that downstream
/// second/minute arithmetic cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericDate(i64);

impl NumericDate {
    const MAX_SECONDS: i64 = i64::MAX / 1000;

    /// A date from whole seconds since the epoch.
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// The current instant.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    /// Whole seconds since the epoch.
    pub fn as_seconds(&self) -> i64 {
        self.0
    }

    /// This date shifted forward.
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// This date shifted backward.
    pub fn minus_seconds(&self, seconds: i64) -> Self {
        Self(self.0.saturating_sub(seconds))
    }

    /// Strictly before `other`.
    pub fn is_before(&self, other: NumericDate) -> bool {
        self.0 < other.0
    }

    /// At or after `other`.
    pub fn is_on_or_after(&self, other: NumericDate) -> bool {
        self.0 >= other.0
    }

    fn from_claim_value(name: &str, value: &Value) -> Result<Self, Error> {
        let seconds = if let Some(int) = value.as_i64() {
            int
        } else if let Some(float) = value.as_f64() {
            if !float.is_finite() {
                return Err(Error::MalformedClaim(format!(
                    "{name} is not a finite number"
                )));
            }
            float as i64
        } else {
            return Err(Error::MalformedClaim(format!(
                "{name} is not a numeric date"
            )));
        };
        if !(0..=Self::MAX_SECONDS).contains(&seconds) {
            return Err(Error::MalformedClaim(format!(
                "{name} value {seconds} is outside the representable date range"
            )));
        }
        Ok(Self(seconds))
    }
}

impl std::fmt::Display for NumericDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered JWT claims set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JwtClaims {
    claims: Map<String, Value>,
}

impl JwtClaims {
    /// An empty claims set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a claims set from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| Error::MalformedClaim(format!("claims are not valid JSON: {err}")))?;
        match value {
            Value::Object(claims) => Ok(Self { claims }),
            _ => Err(Error::MalformedClaim(
                "the claims set is not a JSON object".into(),
            )),
        }
    }

    /// Emit the claims set as JSON text, claims in insertion order.
    pub fn to_json(&self) -> String {
        Value::Object(self.claims.clone()).to_string()
    }

    /// The raw value of any claim.
    pub fn claim_value(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Whether a claim is present.
    pub fn has_claim(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Set any claim to a raw JSON value.
    pub fn set_claim(&mut self, name: &str, value: Value) {
        self.claims.insert(name.to_owned(), value);
    }

    /// Remove a claim.
    pub fn unset_claim(&mut self, name: &str) -> Option<Value> {
        self.claims.remove(name)
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Result<Option<&str>, Error> {
        self.string_claim("iss")
    }

    /// Set the `iss` claim.
    pub fn set_issuer(&mut self, issuer: &str) {
        self.set_claim("iss", Value::from(issuer));
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Result<Option<&str>, Error> {
        self.string_claim("sub")
    }

    /// Set the `sub` claim.
    pub fn set_subject(&mut self, subject: &str) {
        self.set_claim("sub", Value::from(subject));
    }

    /// The `aud` claim: a single string or an array of strings, normalized
    /// to a list. Absent is the empty list; any other shape is malformed.
    pub fn audiences(&self) -> Result<Vec<String>, Error> {
        match self.claims.get("aud") {
            None => Ok(Vec::new()),
            Some(Value::String(aud)) => Ok(vec![aud.clone()]),
            Some(Value::Array(auds)) => auds
                .iter()
                .map(|aud| {
                    aud.as_str().map(str::to_owned).ok_or_else(|| {
                        Error::MalformedClaim("aud array contains a non-string".into())
                    })
                })
                .collect(),
            Some(_) => Err(Error::MalformedClaim(
                "aud is not a string or array of strings".into(),
            )),
        }
    }

    /// Set the `aud` claim to a single string.
    pub fn set_audience(&mut self, audience: &str) {
        self.set_claim("aud", Value::from(audience));
    }

    /// Set the `aud` claim to an array.
    pub fn set_audiences<I, S>(&mut self, audiences: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = audiences
            .into_iter()
            .map(|aud| Value::from(aud.into()))
            .collect();
        self.set_claim("aud", Value::Array(list));
    }

    /// The `exp` claim.
    pub fn expiration_time(&self) -> Result<Option<NumericDate>, Error> {
        self.date_claim("exp")
    }

    /// Set the `exp` claim.
    pub fn set_expiration_time(&mut self, date: NumericDate) {
        self.set_claim("exp", Value::from(date.as_seconds()));
    }

    /// Set `exp` to a point in the future, in minutes from now.
    pub fn set_expiration_time_minutes_in_the_future(&mut self, minutes: f32) {
        let date = NumericDate::now().plus_seconds((minutes * 60.0) as i64);
        self.set_expiration_time(date);
    }

    /// The `nbf` claim.
    pub fn not_before(&self) -> Result<Option<NumericDate>, Error> {
        self.date_claim("nbf")
    }

    /// Set the `nbf` claim.
    pub fn set_not_before(&mut self, date: NumericDate) {
        self.set_claim("nbf", Value::from(date.as_seconds()));
    }

    /// Set `nbf` to a point in the past, in minutes before now.
    pub fn set_not_before_minutes_in_the_past(&mut self, minutes: f32) {
        let date = NumericDate::now().minus_seconds((minutes * 60.0) as i64);
        self.set_not_before(date);
    }

    /// The `iat` claim.
    pub fn issued_at(&self) -> Result<Option<NumericDate>, Error> {
        self.date_claim("iat")
    }

    /// Set the `iat` claim.
    pub fn set_issued_at(&mut self, date: NumericDate) {
        self.set_claim("iat", Value::from(date.as_seconds()));
    }

    /// Set `iat` to the current instant.
    pub fn set_issued_at_to_now(&mut self) {
        self.set_issued_at(NumericDate::now());
    }

    /// The `jti` claim.
    pub fn jwt_id(&self) -> Result<Option<&str>, Error> {
        self.string_claim("jti")
    }

    /// Set the `jti` claim.
    pub fn set_jwt_id(&mut self, jti: &str) {
        self.set_claim("jti", Value::from(jti));
    }

    /// Set `jti` to 128 fresh random bits, base64url encoded.
    pub fn set_generated_jwt_id(&mut self) {
        self.set_generated_jwt_id_with(&mut OsRng)
    }

    /// As [`set_generated_jwt_id`](Self::set_generated_jwt_id) with an
    /// injected generator.
    pub fn set_generated_jwt_id_with(&mut self, rng: &mut dyn CryptoRngCore) {
        let mut id = [0u8; 16];
        rng.fill_bytes(&mut id);
        self.set_jwt_id(&base64::encode(&id));
    }

    fn string_claim(&self, name: &str) -> Result<Option<&str>, Error> {
        match self.claims.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(_) => Err(Error::MalformedClaim(format!("{name} is not a string"))),
        }
    }

    fn date_claim(&self, name: &str) -> Result<Option<NumericDate>, Error> {
        match self.claims.get(name) {
            None => Ok(None),
            Some(value) => NumericDate::from_claim_value(name, value).map(Some),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn rfc7519_section_3_1_example() {
        let claims = JwtClaims::from_json(
            "{\"iss\":\"joe\",\r\n \"exp\":1300819380,\r\n \"http://example.com/is_root\":true}",
        )
        .unwrap();

        assert_eq!(claims.issuer().unwrap(), Some("joe"));
        assert_eq!(
            claims.expiration_time().unwrap(),
            Some(NumericDate::from_seconds(1_300_819_380))
        );
        assert_eq!(
            claims.claim_value("http://example.com/is_root"),
            Some(&json!(true))
        );
    }

    #[test]
    fn audience_string_or_array() {
        let single = JwtClaims::from_json(r#"{"aud":"joe"}"#).unwrap();
        assert_eq!(single.audiences().unwrap(), vec!["joe"]);

        let multi = JwtClaims::from_json(r#"{"aud":["joe","bob"]}"#).unwrap();
        assert_eq!(multi.audiences().unwrap(), vec!["joe", "bob"]);

        let none = JwtClaims::from_json(r#"{}"#).unwrap();
        assert!(none.audiences().unwrap().is_empty());

        let bad = JwtClaims::from_json(r#"{"aud":1}"#).unwrap();
        assert!(matches!(bad.audiences(), Err(Error::MalformedClaim(_))));

        let mixed = JwtClaims::from_json(r#"{"aud":["joe",2]}"#).unwrap();
        assert!(matches!(mixed.audiences(), Err(Error::MalformedClaim(_))));
    }

    #[test]
    fn out_of_range_dates_are_malformed() {
        for bad in [
            r#"{"exp":-1}"#,
            r#"{"exp":"soon"}"#,
            r#"{"exp":9223372036854775807}"#,
        ] {
            let claims = JwtClaims::from_json(bad).unwrap();
            assert!(
                matches!(claims.expiration_time(), Err(Error::MalformedClaim(_))),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn relative_date_setters() {
        let mut claims = JwtClaims::new();
        claims.set_expiration_time_minutes_in_the_future(10.0);
        claims.set_not_before_minutes_in_the_past(5.0);
        claims.set_issued_at_to_now();

        let now = NumericDate::now();
        let exp = claims.expiration_time().unwrap().unwrap();
        let nbf = claims.not_before().unwrap().unwrap();
        assert!(exp.is_on_or_after(now.plus_seconds(590)));
        assert!(exp.is_before(now.plus_seconds(620)));
        assert!(nbf.is_before(now.minus_seconds(290)));
    }

    #[test]
    fn insertion_order_round_trips() {
        let json = r#"{"sub":"x","iss":"me","custom":[1,2]}"#;
        assert_eq!(JwtClaims::from_json(json).unwrap().to_json(), json);
    }

    #[test]
    fn unset_claim_removes_and_returns() {
        let mut claims = JwtClaims::from_json(r#"{"sub":"x","scope":"read"}"#).unwrap();

        assert_eq!(claims.unset_claim("scope"), Some(json!("read")));
        assert_eq!(claims.unset_claim("scope"), None);
        assert!(!claims.has_claim("scope"));
        assert_eq!(claims.to_json(), r#"{"sub":"x"}"#);
    }

    #[test]
    fn generated_jwt_id_is_unique() {
        let mut a = JwtClaims::new();
        let mut b = JwtClaims::new();
        a.set_generated_jwt_id();
        b.set_generated_jwt_id();
        assert_ne!(a.jwt_id().unwrap(), b.jwt_id().unwrap());
        assert_eq!(a.jwt_id().unwrap().unwrap().len(), 22);
    }
}
