use super::{endpoints, media_part, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaKind, MediaSelection};
use common::{AnalysisRecord, AnalysisStatistics, DetectionResponse, RecordsPage};
use reqwest::multipart::Form;

impl ApiClient {
    /// Upload one image for deepfake analysis
    pub async fn detect_image(
        &self,
        token: &str,
        media: &MediaSelection,
    ) -> ClientResult<DetectionResponse> {
        if media.media_type != MediaKind::Image {
            return Err(ClientError::InvalidInput(
                "image detection needs an image file".to_string(),
            ));
        }

        tracing::info!("Analyzing image {} ({})", media.uri.display(), media.mime_type());
        let form = Form::new().part("image", media_part(media, "photo").await?);
        let response: DetectionResponse = self
            .send(self.post(endpoints::DETECT_IMAGE, token).multipart(form))
            .await?;

        tracing::info!(
            "Image analysis finished: record {} with {} face(s)",
            response.record_id,
            response.face_count
        );
        Ok(response)
    }

    /// Upload one video for multi-person analysis
    pub async fn detect_video(
        &self,
        token: &str,
        media: &MediaSelection,
    ) -> ClientResult<DetectionResponse> {
        if media.media_type != MediaKind::Video {
            return Err(ClientError::InvalidInput(
                "video detection needs a video file".to_string(),
            ));
        }

        tracing::info!("Analyzing video {}", media.uri.display());
        let form = Form::new().part("video", media_part(media, "video").await?);
        let response: DetectionResponse = self
            .send(self.post(endpoints::DETECT_VIDEO, token).multipart(form))
            .await?;

        tracing::info!(
            "Video analysis finished: record {} with {} face(s)",
            response.record_id,
            response.face_count
        );
        Ok(response)
    }

    pub async fn records(&self, token: &str) -> ClientResult<RecordsPage> {
        self.send(self.get(endpoints::DETECTION_RECORDS, token))
            .await
    }

    pub async fn record(&self, token: &str, record_id: u64) -> ClientResult<AnalysisRecord> {
        self.send(self.get(&endpoints::detection_record(record_id), token))
            .await
    }

    pub async fn statistics(&self, token: &str) -> ClientResult<AnalysisStatistics> {
        self.send(self.get(endpoints::DETECTION_STATISTICS, token))
            .await
    }
}
