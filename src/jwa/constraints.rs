//! Allow- and block-lists over algorithm identifiers.
//!
//! Constraints are checked *before* any key material touches a primitive.
//! The compact-form header is attacker-controlled, so the declared algorithm
//! must pass the active constraints first; only then is the key validated
//! against it and the primitive invoked.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintType {
    Permit,
    Block,
}

/// A set of permitted or blocked algorithm identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmConstraints {
    constraint_type: ConstraintType,
    identifiers: Vec<String>,
}

impl AlgorithmConstraints {
    /// Permit only the listed identifiers.
    pub fn permit<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            constraint_type: ConstraintType::Permit,
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Block the listed identifiers, permitting everything else.
    pub fn block<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            constraint_type: ConstraintType::Block,
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// No restrictions at all.
    pub fn no_constraints() -> Self {
        Self::block(Vec::<String>::new())
    }

    /// Block the `none` signature algorithm, the default posture for JWS.
    pub fn disallow_none() -> Self {
        Self::block(["none"])
    }

    /// The default key-management constraints for JWE: the padding-oracle
    /// prone RSA1_5 and the password-based PBES2 family must be enabled
    /// explicitly.
    pub fn default_jwe_alg() -> Self {
        Self::block([
            "RSA1_5",
            "PBES2-HS256+A128KW",
            "PBES2-HS384+A192KW",
            "PBES2-HS512+A256KW",
        ])
    }

    /// Check an identifier, failing with
    /// [`Error::AlgorithmConstraintViolated`] if it is not acceptable.
    pub fn check(&self, identifier: &str) -> Result<(), Error> {
        let listed = self.identifiers.iter().any(|id| id == identifier);
        let permitted = match self.constraint_type {
            ConstraintType::Permit => listed,
            ConstraintType::Block => !listed,
        };
        if permitted {
            Ok(())
        } else {
            Err(Error::AlgorithmConstraintViolated(format!(
                "{identifier} is not an acceptable algorithm here"
            )))
        }
    }
}

impl Default for AlgorithmConstraints {
    fn default() -> Self {
        Self::no_constraints()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn permit_list_is_exclusive() {
        let constraints = AlgorithmConstraints::permit(["RS256", "ES256"]);
        assert!(constraints.check("RS256").is_ok());
        assert!(constraints.check("HS256").is_err());
        assert!(constraints.check("none").is_err());
    }

    #[test]
    fn block_list_is_inclusive() {
        let constraints = AlgorithmConstraints::disallow_none();
        assert!(constraints.check("HS256").is_ok());
        assert!(matches!(
            constraints.check("none"),
            Err(Error::AlgorithmConstraintViolated(_))
        ));
    }

    #[test]
    fn jwe_defaults_block_legacy_key_management() {
        let constraints = AlgorithmConstraints::default_jwe_alg();
        assert!(constraints.check("RSA1_5").is_err());
        assert!(constraints.check("PBES2-HS512+A256KW").is_err());
        assert!(constraints.check("RSA-OAEP").is_ok());
        assert!(constraints.check("dir").is_ok());
    }
}
