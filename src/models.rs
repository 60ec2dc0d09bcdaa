use serde::{Deserialize, Serialize};

// Contact form body as posted by the site
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub contact_type: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

// One uploaded file, content already base64-encoded by the browser
#[derive(Deserialize, Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
}

// Email in the provider's wire format
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub from: String,
    pub reply_to: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<OutboundAttachment>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundAttachment {
    pub filename: String,
    pub content: String,
    pub content_type: String,
    pub disposition: &'static str,
}
