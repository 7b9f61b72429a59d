//! Service paths, relative to the configured base URL

pub const LOGIN: &str = "/api/users/login/";
pub const REGISTER: &str = "/api/users/register/";
pub const PROFILE: &str = "/api/users/profile/";
pub const PROFILE_IMAGE_UPLOAD: &str = "/api/users/profile/image/";
pub const PROFILE_IMAGE: &str = "/api/users/profile/image/get/";

pub const DETECT_IMAGE: &str = "/api/detection/image/";
pub const DETECT_VIDEO: &str = "/api/detection/video/";
pub const DETECTION_RECORDS: &str = "/api/detection/records/";
pub const DETECTION_STATISTICS: &str = "/api/detection/statistics/";

pub const PROTECT_IMAGE: &str = "/api/protection/images/";

pub fn detection_record(record_id: u64) -> String {
    format!("{}{}/", DETECTION_RECORDS, record_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_record_path() {
        assert_eq!(detection_record(17), "/api/detection/records/17/");
    }
}
