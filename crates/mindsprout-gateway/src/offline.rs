use crate::{GeneratedTree, Result, SubtopicEntry, TopicGateway, validate_seed};

/// Deterministic stand-in for the topic backend.
///
/// Builds template plans from keyword heuristics, the same templates the backend falls back
/// to when its language model is unavailable. Useful for demos, the CLI's `--offline` mode and
/// tests.
#[derive(Debug, Clone, Default)]
pub struct OfflineGateway;

impl OfflineGateway {
    pub fn new() -> Self {
        Self
    }
}

type Template = (&'static str, [&'static str; 2]);

const BASE_TASKS: [Template; 6] = [
    (
        "Define project requirements",
        ["Identify core features", "Define target audience"],
    ),
    (
        "Design project structure",
        ["Create system architecture", "Define data models"],
    ),
    (
        "Set up development environment",
        ["Install necessary tools", "Configure version control"],
    ),
    (
        "Implement core functionality",
        ["Build essential features", "Create minimal viable product"],
    ),
    (
        "Test and debug",
        ["Create test cases", "Fix identified issues"],
    ),
    (
        "Deploy and launch",
        ["Set up hosting environment", "Publish project"],
    ),
];

/// Keyword families, checked in order; the first hit inserts one task and appends another.
const PROJECT_KINDS: [(&[&str], usize, Template, Template); 3] = [
    (
        &["website", "web app", "web application", "site"],
        2,
        (
            "Design user interface",
            ["Create wireframes", "Design responsive layouts"],
        ),
        (
            "Optimize for performance",
            ["Implement caching", "Optimize load times"],
        ),
    ),
    (
        &["app", "mobile", "android", "ios"],
        2,
        (
            "Design user experience",
            ["Create UI mockups", "Design navigation flow"],
        ),
        (
            "Prepare for app store submission",
            ["Create store listings", "Prepare promotional materials"],
        ),
    ),
    (
        &["data", "analysis", "analytics"],
        1,
        (
            "Collect and prepare data",
            ["Identify data sources", "Clean and transform data"],
        ),
        (
            "Create visualization dashboard",
            ["Design key metrics display", "Implement interactive charts"],
        ),
    ),
];

fn plan_for(seed: &str) -> Vec<Template> {
    let lowered = seed.to_lowercase();
    let mut tasks = BASE_TASKS.to_vec();
    if let Some((_, at, inserted, appended)) = PROJECT_KINDS
        .iter()
        .find(|(keywords, ..)| keywords.iter().any(|k| lowered.contains(*k)))
    {
        tasks.insert(*at, *inserted);
        tasks.push(*appended);
    }
    tasks
}

fn breakdown_for(topic: &str) -> [String; 5] {
    let lowered = topic.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lowered.contains(*w));

    if has(&["design"]) {
        [
            format!("Research best practices for {topic}"),
            "Create initial sketches/mockups".to_string(),
            "Gather feedback on design".to_string(),
            "Refine and finalize design".to_string(),
            "Document design decisions".to_string(),
        ]
    } else if has(&["develop", "implement", "build", "code", "program"]) {
        [
            format!("Break down {topic} into smaller functions"),
            "Write pseudo-code for core logic".to_string(),
            "Implement baseline functionality".to_string(),
            "Add error handling and edge cases".to_string(),
            "Refactor and optimize code".to_string(),
        ]
    } else if has(&["test", "qa", "quality"]) {
        [
            format!("Define test criteria for {topic}"),
            "Create test cases".to_string(),
            "Execute manual testing".to_string(),
            "Implement automated tests if applicable".to_string(),
            "Document test results".to_string(),
        ]
    } else {
        [
            format!("Research requirements for {topic}"),
            "Create detailed plan for implementation".to_string(),
            "Identify potential challenges".to_string(),
            "Execute core components".to_string(),
            "Review and refine outcome".to_string(),
        ]
    }
}

impl TopicGateway for OfflineGateway {
    async fn generate(&self, seed: &str) -> Result<GeneratedTree> {
        let seed = validate_seed(seed, "central idea")?;
        let subtopics = plan_for(seed)
            .into_iter()
            .map(|(name, children)| {
                SubtopicEntry::topic(name, children.map(SubtopicEntry::label).to_vec())
            })
            .collect();
        tracing::info!(%seed, "generated offline topic tree");
        Ok(GeneratedTree {
            central: seed.to_string(),
            subtopics,
        })
    }

    async fn generate_subtopics(&self, topic: &str) -> Result<Vec<SubtopicEntry>> {
        let topic = validate_seed(topic, "topic")?;
        Ok(breakdown_for(topic)
            .into_iter()
            .map(SubtopicEntry::Label)
            .collect())
    }
}
