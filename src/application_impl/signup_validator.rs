use crate::application_port::{FieldError, LoginInput, RegisterInput};

/// Field rules for the auth endpoints. Constructed once and handed to the
/// auth service; there is no global instance.
#[derive(Debug, Clone)]
pub struct SignupValidator {
    min_password_len: usize,
    max_email_len: usize,
    max_name_len: usize,
}

impl SignupValidator {
    pub fn new(min_password_len: usize) -> Self {
        SignupValidator {
            min_password_len,
            max_email_len: 320,
            max_name_len: 255,
        }
    }

    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Returns the input with email and name normalized, or every failed rule.
    pub fn validate_register(&self, input: RegisterInput) -> Result<RegisterInput, Vec<FieldError>> {
        let email = Self::normalize_email(&input.email);
        let name = input.name.trim().to_string();
        let mut errors = Vec::new();

        self.check_email(&email, &mut errors);
        if input.password.is_empty() {
            errors.push(FieldError {
                field: "password",
                rule: "required",
            });
        } else if input.password.chars().count() < self.min_password_len {
            errors.push(FieldError {
                field: "password",
                rule: "min",
            });
        }
        if name.is_empty() {
            errors.push(FieldError {
                field: "name",
                rule: "required",
            });
        } else if name.chars().count() > self.max_name_len {
            errors.push(FieldError {
                field: "name",
                rule: "max",
            });
        }

        if errors.is_empty() {
            Ok(RegisterInput {
                email,
                password: input.password,
                name,
            })
        } else {
            Err(errors)
        }
    }

    pub fn validate_login(&self, input: LoginInput) -> Result<LoginInput, Vec<FieldError>> {
        let email = Self::normalize_email(&input.email);
        let mut errors = Vec::new();

        self.check_email(&email, &mut errors);
        if input.password.is_empty() {
            errors.push(FieldError {
                field: "password",
                rule: "required",
            });
        }

        if errors.is_empty() {
            Ok(LoginInput {
                email,
                password: input.password,
            })
        } else {
            Err(errors)
        }
    }

    fn check_email(&self, email: &str, errors: &mut Vec<FieldError>) {
        if email.is_empty() {
            errors.push(FieldError {
                field: "email",
                rule: "required",
            });
        } else if email.len() > self.max_email_len || !looks_like_email(email) {
            errors.push(FieldError {
                field: "email",
                rule: "email",
            });
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str, name: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn normalizes_valid_input() {
        let validator = SignupValidator::new(8);
        let input = validator
            .validate_register(register("  Alice@Example.COM ", "password1", " Alice "))
            .unwrap();
        assert_eq!(input.email, "alice@example.com");
        assert_eq!(input.name, "Alice");
    }

    #[test]
    fn reports_every_failed_field() {
        let validator = SignupValidator::new(8);
        let errors = validator
            .validate_register(register("not-an-email", "short", ""))
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError { field: "email", rule: "email" },
                FieldError { field: "password", rule: "min" },
                FieldError { field: "name", rule: "required" },
            ]
        );
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a b@c.co"));
        assert!(!looks_like_email("a@.co"));
    }
}
