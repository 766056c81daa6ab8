use serde::{Deserialize, Serialize};

/// One snapshot pushed on the status stream.  The backend owns these flags;
/// the client only reads them and never keeps more than the latest one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GenerationStatus {
    #[serde(default)]
    pub is_generating_script: bool,
    #[serde(default)]
    pub is_script_available: bool,
    #[serde(default)]
    pub is_generating_podcast: bool,
    #[serde(default)]
    pub is_podcast_available: bool,
}

impl GenerationStatus {
    /// Both flags of the script pair are set.
    pub fn script_conflict(&self) -> bool {
        self.is_generating_script && self.is_script_available
    }

    /// Both flags of the podcast pair are set.
    pub fn podcast_conflict(&self) -> bool {
        self.is_generating_podcast && self.is_podcast_available
    }
}

/// One transcript line: a speaker and what they say.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScriptLine {
    pub speaker: String,
    pub content: String,
    #[serde(default)]
    pub speaker_id: u32,
    #[serde(default, alias = "emotions_arr")]
    pub emotion_arr: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AudioUrl {
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPodcast {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePodcast {
    pub uuid: String,
}

/// A reference voice sample known to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VoiceFile {
    pub filename: String,
    pub filepath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VoiceInfo {
    #[serde(default)]
    pub voices: Vec<VoiceFile>,
    #[serde(default)]
    pub custom_voices: Vec<VoiceFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVoice {
    pub filepath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceAssignment {
    pub podcast_uuid: String,
    pub speaker_id: u32,
    pub voice_name: String,
}

/// Fields of the chapter-selection form that starts script generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptRequest {
    pub podcast_uuid: String,
    pub chapters: Vec<String>,
}

impl ScriptRequest {
    /// Split a comma separated chapter list, dropping blanks.
    pub fn from_chapter_list(podcast_uuid: impl Into<String>, raw: &str) -> Self {
        Self {
            podcast_uuid: podcast_uuid.into(),
            chapters: raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Error body returned by the backend on failed requests.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_missing_fields_default_false() {
        let status: GenerationStatus =
            serde_json::from_str(r#"{"is_generating_script": true}"#).unwrap();
        assert!(status.is_generating_script);
        assert!(!status.is_script_available);
        assert!(!status.is_podcast_available);
    }

    #[test]
    fn test_status_rejects_non_bool() {
        let res = serde_json::from_str::<GenerationStatus>(r#"{"is_generating_script": "yes"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_script_line_backend_shape() {
        let raw = r#"[{"speaker":"Host","speaker_id":1,"content":"Welcome","emotion_arr":[0.6,0.05]},
                      {"speaker":"A","content":"Hi"}]"#;
        let lines: Vec<ScriptLine> = serde_json::from_str(raw).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker_id, 1);
        assert_eq!(lines[0].emotion_arr.len(), 2);
        assert_eq!(lines[1].speaker, "A");
        assert_eq!(lines[1].content, "Hi");
        assert_eq!(lines[1].speaker_id, 0);
    }

    #[test]
    fn test_audio_url_null() {
        let url: AudioUrl = serde_json::from_str(r#"{"audio_url": null}"#).unwrap();
        assert!(url.audio_url.is_none());
    }

    #[test]
    fn test_voice_info_partial() {
        let info: VoiceInfo =
            serde_json::from_str(r#"{"voices":[{"filename":"amy","filepath":"voices/amy.wav"}]}"#)
                .unwrap();
        assert_eq!(info.voices.len(), 1);
        assert!(info.custom_voices.is_empty());
    }

    #[test]
    fn test_chapter_list_split() {
        let req = ScriptRequest::from_chapter_list("abc", " intro, , history ,outro");
        assert_eq!(req.podcast_uuid, "abc");
        assert_eq!(req.chapters, vec!["intro", "history", "outro"]);
    }

    #[test]
    fn test_conflict_flags() {
        let status = GenerationStatus {
            is_generating_podcast: true,
            is_podcast_available: true,
            ..Default::default()
        };
        assert!(status.podcast_conflict());
        assert!(!status.script_conflict());
    }
}
