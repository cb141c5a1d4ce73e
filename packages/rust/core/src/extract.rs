//! Extraction modes: each turns the classified message stream into a list of
//! candidate [`KnowledgeItem`]s using the shared pairing and clustering
//! components with its own parameters.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument};

use chatmine_shared::{
    AppConfig, ItemStatus, KnowledgeItem, KnowledgeType, Message, Priority, QaPair,
};
use chatmine_transcript::{Classifier, char_len, normalize_for_key, truncate_chars};

use crate::cluster::{AnswerCluster, Attribution, ClusterRules, cluster_answers, promote};
use crate::pairing::{PairingRules, find_answer};

/// Provenance tags written to `source`.
pub mod source {
    pub const AUTOMATION_PATTERN: &str = "automation_pattern";
    pub const MANAGER_REPEATED: &str = "manager_repeated";
    pub const MANAGER_OPERATIONAL: &str = "manager_operational";
    pub const OPERATIONAL_QA: &str = "operational_qa";
}

/// Which extractors a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Every extractor, in the order repeated answers, instructions, FAQ.
    #[default]
    All,
    RepeatedAnswers,
    Instructions,
    OperationalFaq,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::RepeatedAnswers => "answers",
            Self::Instructions => "instructions",
            Self::OperationalFaq => "faq",
        }
    }

    /// The single-extractor modes this mode expands to, in merge order.
    pub fn steps(self) -> &'static [ExtractionMode] {
        match self {
            Self::All => &[
                Self::RepeatedAnswers,
                Self::Instructions,
                Self::OperationalFaq,
            ],
            Self::RepeatedAnswers => &[Self::RepeatedAnswers],
            Self::Instructions => &[Self::Instructions],
            Self::OperationalFaq => &[Self::OperationalFaq],
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidates produced by one extractor.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub mode: ExtractionMode,
    pub items: Vec<KnowledgeItem>,
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Runs extraction modes against one configuration.
pub struct Extractor<'a> {
    config: &'a AppConfig,
    classifier: &'a Classifier,
    pairing: PairingRules,
    clustering: ClusterRules,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a AppConfig, classifier: &'a Classifier) -> Self {
        Self {
            config,
            classifier,
            pairing: PairingRules::from(&config.mining),
            clustering: ClusterRules::from(&config.mining),
        }
    }

    /// Run every step of `mode`. `pairs` are the backward pairs of all
    /// manager messages (used by the repeated-answer step).
    #[instrument(skip_all, fields(mode = %mode))]
    pub fn run(
        &self,
        mode: ExtractionMode,
        messages: &[Message],
        pairs: &[QaPair],
    ) -> Vec<CandidateSet> {
        mode.steps()
            .iter()
            .map(|&step| {
                let items = match step {
                    ExtractionMode::RepeatedAnswers => self.repeated_answers(pairs),
                    ExtractionMode::Instructions => self.instructions(messages),
                    ExtractionMode::OperationalFaq => self.operational_faq(messages),
                    ExtractionMode::All => unreachable!("steps() expands All into single steps"),
                };
                info!(step = %step, candidates = items.len(), "extraction step complete");
                CandidateSet { mode: step, items }
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Repeated answers
    // -----------------------------------------------------------------------

    /// Promoted answer clusters as `repeated_answer` items.
    pub fn repeated_answers(&self, pairs: &[QaPair]) -> Vec<KnowledgeItem> {
        let answerable: Vec<QaPair> = pairs
            .iter()
            .filter(|p| {
                p.is_media_answer
                    || char_len(p.answer.trim()) >= self.config.mining.min_answer_chars
            })
            .cloned()
            .collect();

        let clusters = cluster_answers(&answerable, &self.clustering);
        let promoted = promote(clusters, self.classifier, &self.clustering);
        debug!(promoted = promoted.len(), "repeated answers promoted");

        promoted.iter().map(|c| self.render_cluster(c)).collect()
    }

    fn render_cluster(&self, cluster: &AnswerCluster) -> KnowledgeItem {
        let template = &self.config.template;
        let canonical = cluster.canonical();

        let manager_name = match &cluster.attribution {
            Attribution::Manager(id) => self.manager_name(id),
            Attribution::MultipleManagers => template.multiple_managers.clone(),
            Attribution::Unattributed => template.unknown_manager.clone(),
        };

        let media = canonical.media.as_ref().filter(|_| canonical.is_media_answer);
        let (answer_type, answer_display) = match media {
            Some(m) => (
                m.media_type.as_str().to_string(),
                format!(
                    "[{}: {}]",
                    template.media_label,
                    m.filename.as_deref().unwrap_or(m.media_type.as_str())
                ),
            ),
            None => ("text".to_string(), canonical.answer.clone()),
        };

        let title_source = cluster
            .example_questions
            .first()
            .map(String::as_str)
            .unwrap_or(&answer_display);
        let title = self.title(title_source);

        let questions = if cluster.example_questions.is_empty() {
            template.no_questions.clone()
        } else {
            cluster
                .example_questions
                .iter()
                .map(|q| format!("- {q}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let content = format!(
            "{}\n{questions}\n\n{} ({manager_name}):\n{answer_display}",
            template.questions_heading, template.answer_heading
        );

        let mut item = KnowledgeItem::mined(
            KnowledgeType::RepeatedAnswer,
            title,
            content,
            source::AUTOMATION_PATTERN,
            to_frequency(cluster.count()),
        );
        item.answer_type = Some(answer_type);
        item.manager_id = canonical.manager_id.clone();
        item.manager_name = Some(manager_name);
        item.media_info = media.cloned();
        item.associated_media = cluster.associated_media.clone();
        item.example_questions = cluster.example_questions.clone();
        item.raw_answer = Some(canonical.answer.clone());
        item.status = Some(ItemStatus::PendingApproval);
        item
    }

    // -----------------------------------------------------------------------
    // Instructions
    // -----------------------------------------------------------------------

    /// Standing manager instructions: repeated texts first (high priority),
    /// then one-off operational messages (normal priority, capped).
    pub fn instructions(&self, messages: &[Message]) -> Vec<KnowledgeItem> {
        let mining = &self.config.mining;
        let template = &self.config.template;

        let candidates: Vec<&Message> = messages
            .iter()
            .filter(|m| m.is_manager && !m.is_media() && !self.classifier.is_noise(&m.text))
            .collect();

        // Ordered key counts (first message kept as the example).
        let mut counted: Vec<(String, &Message, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for msg in &candidates {
            let key = normalize_for_key(&msg.text, mining.instruction_key_chars);
            if char_len(&key) < mining.min_instruction_key_chars {
                continue;
            }
            match index.get(&key) {
                Some(&slot) => counted[slot].2 += 1,
                None => {
                    index.insert(key.clone(), counted.len());
                    counted.push((key, msg, 1));
                }
            }
        }

        let mut repeated: Vec<(String, &Message, usize)> = counted
            .into_iter()
            .filter(|(_, _, count)| *count >= mining.repetition_threshold)
            .collect();
        repeated.sort_by(|a, b| b.2.cmp(&a.2));

        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        for (key, msg, count) in &repeated {
            seen.insert(key.clone());
            let mut item = self.instruction_item(
                msg,
                &template.repeated_instruction_label,
                source::MANAGER_REPEATED,
                to_frequency(*count),
            );
            item.priority = Some(Priority::High);
            items.push(item);
        }

        let mut operational = 0usize;
        for msg in &candidates {
            if operational >= mining.operational_cap {
                break;
            }
            let key = normalize_for_key(&msg.text, mining.instruction_key_chars);
            if seen.contains(&key) {
                continue;
            }
            if !self.classifier.has_operational_content(&msg.text)
                || char_len(msg.text.trim()) < mining.min_operational_chars
            {
                continue;
            }
            seen.insert(key);
            let mut item = self.instruction_item(
                msg,
                &template.operational_instruction_label,
                source::MANAGER_OPERATIONAL,
                1,
            );
            item.priority = Some(Priority::Normal);
            items.push(item);
            operational += 1;
        }

        debug!(
            repeated = repeated.len(),
            operational, "instructions extracted"
        );

        items
    }

    fn instruction_item(
        &self,
        msg: &Message,
        label: &str,
        source: &str,
        frequency: u32,
    ) -> KnowledgeItem {
        let manager_name = self.message_manager_name(msg);
        let content = format!("{label} ({manager_name}): {}", msg.text);
        let mut item = KnowledgeItem::mined(
            KnowledgeType::Instruction,
            self.title(&msg.text),
            content,
            source,
            frequency,
        );
        item.manager_id = msg.manager_id.clone();
        item.manager_name = Some(manager_name);
        item
    }

    // -----------------------------------------------------------------------
    // Operational FAQ
    // -----------------------------------------------------------------------

    /// Employee questions answered by a manager within the forward window
    /// where either side is operational.
    pub fn operational_faq(&self, messages: &[Message]) -> Vec<KnowledgeItem> {
        let mining = &self.config.mining;
        let template = &self.config.template;
        let rules = PairingRules {
            min_answer_chars: mining.faq_min_answer_chars,
            ..self.pairing.clone()
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();
        let mut found = 0usize;

        for (i, question) in messages.iter().enumerate() {
            if question.is_manager || question.is_media() {
                continue;
            }
            if self.classifier.is_noise(&question.text)
                || self.classifier.is_placeholder(&question.text)
            {
                continue;
            }
            let len = char_len(question.text.trim());
            if len < mining.faq_question_min_chars || len > mining.faq_question_max_chars {
                continue;
            }

            let Some(j) = find_answer(messages, i, self.classifier, &rules) else {
                continue;
            };
            let answer = &messages[j];
            if !self.classifier.has_operational_content(&question.text)
                && !self.classifier.has_operational_content(&answer.text)
            {
                continue;
            }
            found += 1;

            let key = normalize_for_key(&question.text, mining.dedup_title_chars);
            if !seen.insert(key) {
                continue;
            }

            let manager_name = self.message_manager_name(answer);
            let content = format!(
                "{}: {}\n\n{} ({manager_name}): {}",
                template.faq_question_label, question.text, template.faq_answer_label, answer.text
            );
            let mut item = KnowledgeItem::mined(
                KnowledgeType::Faq,
                self.title(&question.text),
                content,
                source::OPERATIONAL_QA,
                1,
            );
            item.manager_id = answer.manager_id.clone();
            item.manager_name = Some(manager_name);
            items.push(item);
        }

        debug!(pairs = found, unique = items.len(), "operational faq extracted");
        items
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn title(&self, text: &str) -> String {
        truncate_chars(text.trim(), self.config.mining.title_max_chars)
            .trim_end()
            .to_string()
    }

    fn manager_name(&self, id: &str) -> String {
        self.config
            .manager_label(id)
            .unwrap_or(id)
            .to_string()
    }

    fn message_manager_name(&self, msg: &Message) -> String {
        match msg.manager_id.as_deref() {
            Some(id) => self.manager_name(id),
            None => self.config.template.unknown_manager.clone(),
        }
    }
}

fn to_frequency(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
