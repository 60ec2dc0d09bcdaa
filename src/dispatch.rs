use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::error::DispatchError;
use crate::mailer::EmailSender;
use crate::metrics::{DISPATCH_LATENCY, EMAILS_SENT, EMAIL_FAILURES};
use crate::models::{OutboundAttachment, OutboundEmail};
use crate::validator::ValidSubmission;

// Provider key and recipient, resolved per request by the config check
#[derive(Debug, Clone)]
pub struct Route {
    pub api_key: String,
    pub receiver: String,
}

// Turns validated submissions into emails and hands them to the sender
pub struct Dispatcher {
    sender: Arc<dyn EmailSender>,
    from: String,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, from: String) -> Self {
        Self { sender, from }
    }

    pub async fn dispatch(
        &self,
        submission: ValidSubmission,
        route: &Route,
    ) -> Result<(), DispatchError> {
        let email = build_email(&self.from, &route.receiver, submission);
        let attachments = email.attachments.len();
        let start = Instant::now();

        let result = self.sender.send(&route.api_key, &email).await;
        DISPATCH_LATENCY.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                EMAILS_SENT.inc();
                info!(attachments, "Contact email sent");
            }
            Err(e) => {
                EMAIL_FAILURES.inc();
                error!(error = %e, "Contact email failed");
            }
        }
        result
    }
}

pub fn build_email(from: &str, receiver: &str, submission: ValidSubmission) -> OutboundEmail {
    OutboundEmail {
        from: from.to_string(),
        reply_to: submission.email.clone(),
        to: receiver.to_string(),
        subject: submission.subject.clone(),
        text: render_body(&submission),
        attachments: submission
            .attachments
            .into_iter()
            .map(|a| OutboundAttachment {
                filename: a.name,
                content: a.content,
                content_type: a.mime_type,
                disposition: "attachment",
            })
            .collect(),
    }
}

fn render_body(s: &ValidSubmission) -> String {
    let mut text = format!("Nome: {}\nE-mail: {}\n", s.name, s.email);
    if let Some(kind) = &s.contact_type {
        text.push_str(&format!("Tipo: {}\n", kind));
    }
    text.push_str(&format!("Mensagem:\n{}", s.message));
    text
}
