use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{source_emoji, Digest, Notifier, FOOTER_TEXT, NO_NEWS_TEXT};

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} missing"))
}

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_env() -> Result<Self> {
        let host = env_required("SMTP_HOST")?;
        let creds = Credentials::new(env_required("SMTP_USER")?, env_required("SMTP_PASS")?);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = env_required("NOTIFY_EMAIL_FROM")?
            .parse()
            .context("invalid NOTIFY_EMAIL_FROM")?;
        let to = env_required("NOTIFY_EMAIL_TO")?
            .parse()
            .context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }
}

pub fn render_body(digest: &Digest) -> String {
    let mut body = format!("{}\n\n", digest.title());
    if digest.is_empty() {
        body.push_str(NO_NEWS_TEXT);
        body.push('\n');
    }
    for (i, e) in digest.entries.iter().enumerate() {
        body.push_str(&format!(
            "{}. {}\n   {} {}\n   {}\n\n   {}\n   > {}\n\n",
            i + 1,
            e.news.title,
            source_emoji(&e.news.source),
            e.news.source,
            e.news.url,
            e.summary,
            e.comment
        ));
    }
    body.push_str(&format!("--\n{FOOTER_TEXT}\n"));
    body
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest.title())
            .header(header::ContentType::TEXT_PLAIN)
            .body(render_body(digest))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
