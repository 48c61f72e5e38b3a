//! 刷卡结果的声音提示
//!
//! SUCCESS 短响 1 次，PARTIAL 短响 2 次，DENIED / UNKNOWN 长响 1 次，
//! 其他结果和提交失败长响 3 次。关闭蜂鸣器时全部为空操作。

use std::sync::Arc;

use domain::TagResult;
use fm_card::apdu;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub tone: Tone,
    pub repeat: u8,
}

/// 后端结论到提示音；`None` 表示没有拿到结论（提交失败）
pub fn cue_for(result: Option<TagResult>) -> Cue {
    match result {
        Some(TagResult::Success) => Cue {
            tone: Tone::Short,
            repeat: 1,
        },
        Some(TagResult::Partial) => Cue {
            tone: Tone::Short,
            repeat: 2,
        },
        Some(TagResult::Denied | TagResult::Unknown) => Cue {
            tone: Tone::Long,
            repeat: 1,
        },
        Some(TagResult::Error) | None => Cue {
            tone: Tone::Long,
            repeat: 3,
        },
    }
}

/// 每响一次对应一条 ACR122U 蜂鸣器 APDU
pub fn buzzer_apdus(cue: Cue) -> Vec<[u8; 5]> {
    let command = apdu::buzzer(cue.tone == Tone::Long);
    vec![command; usize::from(cue.repeat)]
}

/// 提示音输出端
pub trait CueSink: Send + Sync {
    fn play(&self, cue: Cue);
}

/// 默认输出：只记日志
#[derive(Debug, Default)]
pub struct LogCueSink;

impl CueSink for LogCueSink {
    fn play(&self, cue: Cue) {
        debug!(target: "fm.agent", tone = ?cue.tone, repeat = cue.repeat, "buzzer_cue");
    }
}

#[derive(Clone)]
pub struct FeedbackController {
    enabled: bool,
    sink: Arc<dyn CueSink>,
}

impl FeedbackController {
    pub fn new(enabled: bool) -> Self {
        Self::with_sink(enabled, Arc::new(LogCueSink))
    }

    pub fn with_sink(enabled: bool, sink: Arc<dyn CueSink>) -> Self {
        Self { enabled, sink }
    }

    pub fn signal(&self, result: Option<TagResult>) {
        if self.enabled {
            self.sink.play(cue_for(result));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        cues: Mutex<Vec<Cue>>,
    }

    impl CueSink for RecordingSink {
        fn play(&self, cue: Cue) {
            self.cues.lock().expect("cues").push(cue);
        }
    }

    #[test]
    fn cue_table() {
        assert_eq!(cue_for(Some(TagResult::Success)), Cue { tone: Tone::Short, repeat: 1 });
        assert_eq!(cue_for(Some(TagResult::Partial)), Cue { tone: Tone::Short, repeat: 2 });
        assert_eq!(cue_for(Some(TagResult::Denied)), Cue { tone: Tone::Long, repeat: 1 });
        assert_eq!(cue_for(Some(TagResult::Unknown)), Cue { tone: Tone::Long, repeat: 1 });
        assert_eq!(cue_for(Some(TagResult::Error)), Cue { tone: Tone::Long, repeat: 3 });
        assert_eq!(cue_for(None), Cue { tone: Tone::Long, repeat: 3 });
    }

    #[test]
    fn disabled_controller_is_silent() {
        let sink = Arc::new(RecordingSink::default());
        FeedbackController::with_sink(false, sink.clone()).signal(Some(TagResult::Success));
        assert!(sink.cues.lock().expect("cues").is_empty());

        FeedbackController::with_sink(true, sink.clone()).signal(Some(TagResult::Partial));
        assert_eq!(sink.cues.lock().expect("cues").len(), 1);
    }

    #[test]
    fn partial_cue_is_two_short_beeps() {
        let apdus = buzzer_apdus(cue_for(Some(TagResult::Partial)));
        assert_eq!(apdus, vec![[0xFF, 0x00, 0x52, 0x01, 0x00]; 2]);
        let apdus = buzzer_apdus(cue_for(None));
        assert_eq!(apdus.len(), 3);
        assert_eq!(apdus[0][3], 0xFF);
    }
}
