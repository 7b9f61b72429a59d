use serde::Serialize;

/// An external place where suspicious content can be reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportChannel {
    pub title: &'static str,
    pub url: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation: Option<&'static str>,
}

impl ReportChannel {
    pub fn emergency_uri(&self) -> Option<String> {
        self.emergency.map(|number| format!("tel:{}", number))
    }

    pub fn consultation_uri(&self) -> Option<String> {
        self.consultation.map(|number| format!("tel:{}", number))
    }
}

pub const NAVER_REPORT: ReportChannel = ReportChannel {
    title: "Naver report center",
    url: "https://help.naver.com/service/30001/contents/23019?lang=ko&osType=COMMONOS",
    emergency: None,
    consultation: None,
};

pub const NAVER_RIGHTS: ReportChannel = ReportChannel {
    title: "Naver rights protection center",
    url: "https://right.naver.com/",
    emergency: None,
    consultation: None,
};

pub const ECRM: ReportChannel = ReportChannel {
    title: "Cyber crime reporting system (ECRM)",
    url: "https://ecrm.police.go.kr/minwon/main",
    emergency: Some("112"),
    consultation: Some("182"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Platform takedown requests
    Simple,
    /// Criminal complaint to the police
    Ecrm,
}

impl std::str::FromStr for ReportKind {
    type Err = crate::CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ReportKind::Simple),
            "ecrm" | "police" => Ok(ReportKind::Ecrm),
            other => Err(crate::CommonError::InvalidData(format!(
                "unknown report kind: {}",
                other
            ))),
        }
    }
}

pub fn channels(kind: ReportKind) -> Vec<ReportChannel> {
    match kind {
        ReportKind::Simple => vec![NAVER_REPORT, NAVER_RIGHTS],
        ReportKind::Ecrm => vec![ECRM],
    }
}
