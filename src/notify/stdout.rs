use anyhow::Result;
use std::io::Write;

use super::{github::issue_body, Digest, Notifier};

/// Prints the Markdown digest. Handy for dry runs and CI logs.
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n\n{}", digest.title(), issue_body(digest))?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
