use serde::Serialize;

/// Parameters the backend appends to confirmation links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
	pub error: Option<String>,
	pub error_code: Option<String>,
	pub error_description: Option<String>,
	pub kind: Option<String>,
	pub token: Option<String>,
	pub access_token: Option<String>,
}

impl CallbackParams {
	pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
		let mut params = Self::default();
		for (key, value) in pairs {
			let value = Some(value.as_ref().to_owned()).filter(|v| !v.is_empty());
			let slot = match key.as_ref() {
				"error" => &mut params.error,
				"error_code" => &mut params.error_code,
				"error_description" => &mut params.error_description,
				"type" => &mut params.kind,
				"token" | "token_hash" => &mut params.token,
				"access_token" => &mut params.access_token,
				_ => continue,
			};

			if slot.is_none() {
				*slot = value;
			}
		}
		params
	}

	fn has_error(&self) -> bool {
		self.error.is_some() || self.error_code.is_some() || self.error_description.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackTarget {
	/// The verify page, carrying the error parameters if any
	Verify(Vec<(&'static str, String)>),
	Home,
}

impl CallbackTarget {
	pub fn classify(params: &CallbackParams) -> Self {
		if params.has_error() {
			let forwarded = [
				("error", &params.error),
				("error_code", &params.error_code),
				("error_description", &params.error_description),
			]
			.into_iter()
			.filter_map(|(key, value)| value.clone().map(|v| (key, v)))
			.collect();

			return Self::Verify(forwarded);
		}

		let verification = matches!(params.kind.as_deref(), Some("signup" | "recovery"))
			|| params.token.is_some()
			|| params.access_token.is_some();

		if verification {
			Self::Verify(Vec::new())
		} else {
			Self::Home
		}
	}

	pub fn location(&self) -> String {
		match self {
			Self::Home => "/".to_owned(),
			Self::Verify(params) if params.is_empty() => "/auth/verify".to_owned(),
			Self::Verify(params) => {
				let query = url::form_urlencoded::Serializer::new(String::new())
					.extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
					.finish();
				format!("/auth/verify?{query}")
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyAction {
	pub label: &'static str,
	pub href: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyView {
	pub success: bool,
	pub title: &'static str,
	pub message: String,
	pub error_code: Option<String>,
	pub footer: &'static str,
	pub actions: Vec<VerifyAction>,
}

impl VerifyView {
	pub fn new(params: &CallbackParams) -> Self {
		if params.has_error() {
			Self {
				success: false,
				title: "Verification Failed",
				message: params.error_description.clone().unwrap_or_else(|| {
					"The verification link is invalid or has expired. Please try signing up again or contact support if the problem persists.".to_owned()
				}),
				error_code: params.error_code.clone(),
				footer: "Please try again or contact support for assistance.",
				actions: vec![
					VerifyAction {
						label: "Try Signing Up Again",
						href: "/auth/signup",
					},
					VerifyAction {
						label: "Go to Sign In",
						href: "/auth/signin",
					},
				],
			}
		} else {
			Self {
				success: true,
				title: "Email Verified!",
				message: "Your email has been verified and your account is now active. You can now sign in to access your startup dashboard.".to_owned(),
				error_code: None,
				footer: "Welcome to the Startup Directory!",
				actions: vec![
					VerifyAction {
						label: "Sign In to Your Account",
						href: "/auth/signin",
					},
					VerifyAction {
						label: "Back to Homepage",
						href: "/",
					},
				],
			}
		}
	}
}
