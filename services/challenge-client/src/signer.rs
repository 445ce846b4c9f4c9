//! Signing seam
//!
//! Wallet integration lives outside this crate. Anything that can turn the
//! challenge payload into a personal-message signature implements
//! [`MessageSigner`].

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::SignError;

#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// Sign `payload` as a personal message and return the hex signature.
    async fn sign(&self, payload: &str) -> Result<String, SignError>;
}

/// Signer that hands back a signature obtained out of band.
///
/// Used by the CLI when the user signs the printed payload in their own
/// wallet and pastes the result.
#[derive(Debug, Clone)]
pub struct PresignedSigner {
    signature: String,
}

impl PresignedSigner {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }
}

#[async_trait]
impl MessageSigner for PresignedSigner {
    async fn sign(&self, _payload: &str) -> Result<String, SignError> {
        let signature = self.signature.trim();
        if signature.is_empty() {
            return Err(SignError::Failed("empty signature".to_string()));
        }
        Ok(signature.to_string())
    }
}

/// Signer that shows the payload and reads the signature back, one line
/// per request.
///
/// A blank line means the user declined. End of input means nobody is
/// there to sign, reported as [`SignError::NoAccount`].
pub struct PromptSigner<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R, W> PromptSigner<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input.into_inner(), self.output.into_inner())
    }
}

#[async_trait]
impl<R, W> MessageSigner for PromptSigner<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn sign(&self, payload: &str) -> Result<String, SignError> {
        let prompt = format!("Sign this message with your wallet:\n\n{payload}\n\nSignature: ");
        {
            let mut output = self.output.lock().await;
            output
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| SignError::Failed(e.to_string()))?;
            output.flush().await.map_err(|e| SignError::Failed(e.to_string()))?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|e| SignError::Failed(e.to_string()))?;

        match line.trim() {
            _ if read == 0 => Err(SignError::NoAccount),
            "" => Err(SignError::Rejected),
            signature => Ok(signature.to_string()),
        }
    }
}
