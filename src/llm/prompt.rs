//! Prompt builder for transcription and pronunciation feedback.
//!
//! [`PromptBuilder`] produces the two instructions the pipeline sends:
//! * **Transcription**: listen to a recording, write what was said in kana
//!   or kanji-kana, no punctuation, [`UNINTELLIGIBLE_MARKER`] when nothing
//!   usable was heard.
//! * **Feedback**: compare the reference with the transcription and answer
//!   with one JSON object under a fixed set of teaching rules.
//!
//! The learner's display language is selected at construction time; any
//! language other than Japanese adds a request for supplementary notes in
//! that language.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::Language;

/// Placeholder transcription for unintelligible audio.
pub const UNINTELLIGIBLE_MARKER: &str = "（聞き取れませんでした）";

// ---------------------------------------------------------------------------
// SelfAssessment
// ---------------------------------------------------------------------------

/// How close the learner felt their attempt was to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfAssessment {
    Same,
    Close,
    Difficult,
    Unknown,
}

impl SelfAssessment {
    pub const ALL: [SelfAssessment; 4] = [
        SelfAssessment::Same,
        SelfAssessment::Close,
        SelfAssessment::Difficult,
        SelfAssessment::Unknown,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SelfAssessment::Same => "same",
            SelfAssessment::Close => "close",
            SelfAssessment::Difficult => "difficult",
            SelfAssessment::Unknown => "unknown",
        }
    }

    /// What the learner meant, in the words the feedback prompt uses.
    pub fn description(self) -> &'static str {
        match self {
            SelfAssessment::Same => "お手本と同じように言えた",
            SelfAssessment::Close => "だいたい言えたけど、少し違った",
            SelfAssessment::Difficult => "難しかった",
            SelfAssessment::Unknown => "わからない",
        }
    }
}

impl fmt::Display for SelfAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSelfAssessment(pub String);

impl fmt::Display for UnknownSelfAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "self-assessment must be one of same, close, difficult, unknown (got {:?})",
            self.0
        )
    }
}

impl std::error::Error for UnknownSelfAssessment {}

impl FromStr for SelfAssessment {
    type Err = UnknownSelfAssessment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelfAssessment::ALL
            .into_iter()
            .find(|a| a.code() == s)
            .ok_or_else(|| UnknownSelfAssessment(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const TRANSCRIPTION_INSTRUCTION: &str = "\
この音声を日本語で文字起こししてください。
日本語の発音を聞き取って、ひらがなまたは漢字かな混じりでテキストに変換してください。
句読点は入れずに、聞き取った内容をそのまま出力してください。";

const FEEDBACK_ROLE: &str = "\
あなたは日本語学習をサポートする優しい先生です。
学生の発音をお手本と比較して、アドバイスしてください。";

/// The teaching rules, in the order they must be applied.
const FEEDBACK_RULES: [&str; 6] = [
    "最初に「伝わった」ことを必ず認める（これが最も重要）",
    "良かった点を1〜2個見つける",
    "改善点は1個だけ、具体的に伝える",
    "点数やスコアは絶対につけない",
    "励ましの言葉で終わる",
    "やさしい日本語で書く（N5レベルの語彙）",
];

const FEEDBACK_FORMAT: &str = "\
【出力形式】
必ず以下のJSON形式だけで出力してください。他の形式や説明文は不可です。
フィールドは次の4つだけです。
{
  \"message\": \"伝わりましたよ！ などの短いメッセージ\",
  \"goodPoints\": [\"良かった点1\", \"良かった点2\"],
  \"improvementTip\": \"もっと良くなるための具体的なヒント1つ\",
  \"encouragement\": \"励ましの言葉\"
}";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds transcription and feedback instructions.
///
/// # Example
/// ```rust
/// use speak_practice::catalog::Language;
/// use speak_practice::llm::{PromptBuilder, SelfAssessment};
///
/// let builder = PromptBuilder::new(Language::En);
/// let prompt = builder.feedback_prompt("おはよう", "おはよう", SelfAssessment::Same);
/// assert!(prompt.contains("英語"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    language: Language,
}

impl PromptBuilder {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Instruction sent alongside the audio.
    pub fn transcription_instruction(&self) -> String {
        format!(
            "{TRANSCRIPTION_INSTRUCTION}\n音声が聞き取れない場合は「{UNINTELLIGIBLE_MARKER}」と出力してください。"
        )
    }

    /// Instruction for the feedback call.
    ///
    /// Structure (in order):
    /// 1. Role
    /// 2. Rules, plus the language note for non-Japanese learners
    /// 3. Reference text, transcription, self-assessment
    /// 4. Output format
    pub fn feedback_prompt(
        &self,
        reference: &str,
        transcription: &str,
        assessment: SelfAssessment,
    ) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(FEEDBACK_ROLE);

        prompt.push_str("\n\n【重要なルール】\n");
        for rule in FEEDBACK_RULES {
            prompt.push_str("- ");
            prompt.push_str(rule);
            prompt.push('\n');
        }
        if let Some(note) = self.language_note() {
            prompt.push_str(&note);
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "\n【入力情報】\nお手本テキスト: {reference}\n学生の発音（音声認識結果）: {transcription}\n学生の自己評価: {}\n\n",
            assessment.description()
        ));
        prompt.push_str(FEEDBACK_FORMAT);
        prompt
    }

    fn language_note(&self) -> Option<String> {
        match self.language {
            Language::Ja => None,
            other => Some(format!(
                "ユーザーの母語は{}です。必要に応じてその言語での補足を入れてください。",
                other.japanese_name()
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
