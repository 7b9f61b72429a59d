use super::{endpoints, media_part, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::media::MediaSelection;
use common::{ProtectionJob, ProtectionRequest};
use reqwest::multipart::Form;

impl ApiClient {
    /// Submit an image for watermarking and/or adversarial noise
    pub async fn protect_image(
        &self,
        token: &str,
        media: &MediaSelection,
        request: &ProtectionRequest,
    ) -> ClientResult<ProtectionJob> {
        if !media.is_image() {
            return Err(ClientError::InvalidInput(
                "only images can be protected".to_string(),
            ));
        }

        tracing::info!(
            "Protecting {} (job type {})",
            media.uri.display(),
            request.job_type.as_str()
        );

        let form = Form::new()
            .part("files", media_part(media, "image").await?)
            .text("job_type", request.job_type.as_str())
            .text("watermark_text", request.watermark_text.clone());

        let job: ProtectionJob = self
            .send(self.post(endpoints::PROTECT_IMAGE, token).multipart(form))
            .await?;

        tracing::info!(
            "Protection job {} is {} with {} file(s)",
            job.job_id,
            job.status,
            job.protected_files.len()
        );
        Ok(job)
    }
}
