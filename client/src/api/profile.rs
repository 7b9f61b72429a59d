use super::{endpoints, media_part, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::media::MediaSelection;
use common::ProfileImage;
use reqwest::multipart::Form;

impl ApiClient {
    pub async fn upload_profile_image(
        &self,
        token: &str,
        media: &MediaSelection,
    ) -> ClientResult<ProfileImage> {
        if !media.is_image() {
            return Err(ClientError::InvalidInput(
                "profile pictures must be images".to_string(),
            ));
        }

        let form = Form::new().part("image", media_part(media, "profile").await?);
        let image: ProfileImage = self
            .send(
                self.post(endpoints::PROFILE_IMAGE_UPLOAD, token)
                    .multipart(form),
            )
            .await?;

        tracing::info!("Profile image uploaded");
        Ok(image)
    }

    /// Current profile image; any failure degrades to "no image"
    pub async fn profile_image(&self, token: &str) -> ProfileImage {
        match self.send(self.get(endpoints::PROFILE_IMAGE, token)).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Failed to fetch profile image: {}", e);
                ProfileImage::default()
            }
        }
    }
}
