use serde::Deserialize;

use super::{check_len, is_email, ValidationErrors};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignInForm {
	pub email: String,
	pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
	pub email: String,
	pub password: String,
	pub name: String,
	/// Where to send the user after the confirmation link
	pub redirect_to: Option<String>,
}

fn check_credentials(errors: &mut ValidationErrors, email: &str, password: &str) {
	if !is_email(email) {
		errors.push("email", "Invalid email address");
	}

	check_len(
		errors,
		"password",
		password,
		Some((6, "Password must be at least 6 characters")),
		None,
	);
}

impl SignInForm {
	pub fn validate(mut self) -> Result<Self, ValidationErrors> {
		self.email = self.email.trim().to_owned();

		let mut errors = ValidationErrors::new();
		check_credentials(&mut errors, &self.email, &self.password);
		errors.into_result(self)
	}
}

impl SignUpForm {
	pub fn validate(mut self) -> Result<Self, ValidationErrors> {
		self.email = self.email.trim().to_owned();
		self.name = self.name.trim().to_owned();

		let mut errors = ValidationErrors::new();
		check_credentials(&mut errors, &self.email, &self.password);
		check_len(
			&mut errors,
			"name",
			&self.name,
			Some((2, "Name must be at least 2 characters")),
			Some((60, "Name must be less than 60 characters")),
		);
		errors.into_result(self)
	}
}
