use futures::executor::block_on;
use mindsprout::gateway::{self, GeneratedTree, OfflineGateway, TopicGateway};
use mindsprout::render::{NodeVisualState, SvgSurface, ViewSurface};
use mindsprout::{
    ClickOutcome, ExpansionOutcome, IdSource, NodeId, Notification, NotificationLevel, Session,
    SessionError, SubtopicEntry, TopicTree,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct ScriptedGateway {
    tree: Mutex<Option<gateway::Result<GeneratedTree>>>,
    subtopics: Mutex<HashMap<String, gateway::Result<Vec<SubtopicEntry>>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    fn with_trip() -> Self {
        let gateway = Self::default();
        gateway.set_tree(Ok(GeneratedTree {
            central: "Plan a trip".to_string(),
            subtopics: vec![
                SubtopicEntry::topic("Destinations", vec!["Beach".into(), "Mountains".into()]),
                "Budget".into(),
            ],
        }));
        gateway
    }

    fn set_tree(&self, tree: gateway::Result<GeneratedTree>) {
        *self.tree.lock().unwrap() = Some(tree);
    }

    fn answer(&self, topic: &str, result: gateway::Result<Vec<SubtopicEntry>>) {
        self.subtopics
            .lock()
            .unwrap()
            .insert(topic.to_string(), result);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TopicGateway for ScriptedGateway {
    async fn generate(&self, _seed: &str) -> gateway::Result<GeneratedTree> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tree
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(transport("no tree scripted")))
    }

    async fn generate_subtopics(&self, topic: &str) -> gateway::Result<Vec<SubtopicEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.subtopics
            .lock()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }
}

fn transport(message: &str) -> gateway::Error {
    gateway::Error::Transport {
        status: Some(500),
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Render(usize),
    ApplyDelta(Vec<NodeId>),
    Remove(Vec<NodeId>),
    State(NodeId, NodeVisualState),
    Label(NodeId, String),
}

#[derive(Default)]
struct RecordingSurface {
    calls: Vec<Call>,
    fail_states: bool,
}

impl RecordingSurface {
    fn structural(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Render(_) | Call::ApplyDelta(_) | Call::Remove(_)))
            .collect()
    }

    fn last_state(&self, id: &NodeId) -> Option<NodeVisualState> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::State(target, state) if target == id => Some(*state),
            _ => None,
        })
    }
}

impl ViewSurface for RecordingSurface {
    fn render(&mut self, tree: &TopicTree) -> mindsprout::render::Result<()> {
        self.calls.push(Call::Render(tree.len()));
        Ok(())
    }

    fn apply_delta(
        &mut self,
        added: &[NodeId],
        _tree: &TopicTree,
    ) -> mindsprout::render::Result<()> {
        self.calls.push(Call::ApplyDelta(added.to_vec()));
        Ok(())
    }

    fn remove(&mut self, removed: &[NodeId]) -> mindsprout::render::Result<()> {
        self.calls.push(Call::Remove(removed.to_vec()));
        Ok(())
    }

    fn set_node_visual_state(
        &mut self,
        id: &NodeId,
        state: NodeVisualState,
    ) -> mindsprout::render::Result<()> {
        if self.fail_states {
            return Err(mindsprout::render::Error::UnknownElement { id: id.clone() });
        }
        self.calls.push(Call::State(id.clone(), state));
        Ok(())
    }

    fn set_label(&mut self, id: &NodeId, label: &str) -> mindsprout::render::Result<()> {
        self.calls.push(Call::Label(id.clone(), label.to_string()));
        Ok(())
    }
}

type TestSession = Session<ScriptedGateway, RecordingSurface>;

fn session(gateway: ScriptedGateway) -> TestSession {
    Session::with_tree(
        TopicTree::with_id_source(IdSource::sequential("n")),
        gateway,
        RecordingSurface::default(),
    )
}

fn generated(gateway: ScriptedGateway) -> TestSession {
    let mut session = session(gateway);
    block_on(session.generate("Plan a trip")).unwrap();
    session.take_notifications();
    session
}

fn id(raw: &str) -> NodeId {
    NodeId::from(raw)
}

fn selected_only() -> NodeVisualState {
    NodeVisualState {
        selected: true,
        ..NodeVisualState::default()
    }
}

#[test]
fn generate_renders_the_new_tree() {
    let mut session = session(ScriptedGateway::with_trip());
    let inserted = block_on(session.generate("  Plan a trip ")).unwrap();

    assert_eq!(inserted.added.len(), 5);
    assert_eq!(session.tree().root().unwrap().label(), "Plan a trip");
    assert_eq!(session.surface().calls, vec![Call::Render(5)]);
    assert_eq!(
        session.take_notifications()[0].message,
        "Mind map generated successfully"
    );
    assert!(session.notifications().is_empty());
}

#[test]
fn blank_seed_never_reaches_the_gateway() {
    let mut session = session(ScriptedGateway::with_trip());
    let err = block_on(session.generate("   ")).unwrap_err();

    assert!(matches!(
        err,
        SessionError::Model(mindsprout::Error::InvalidInput { .. })
    ));
    assert_eq!(session.gateway().calls(), 0);
    assert!(session.surface().calls.is_empty());
    assert_eq!(session.notifications()[0].level, NotificationLevel::Warning);
}

#[test]
fn failed_generate_keeps_the_previous_map() {
    let mut session = generated(ScriptedGateway::with_trip());
    session
        .gateway()
        .set_tree(Err(transport("model overloaded")));

    let err = block_on(session.generate("Learn piano")).unwrap_err();
    assert!(matches!(err, SessionError::Gateway(_)));
    assert_eq!(session.tree().len(), 5);
    assert_eq!(session.tree().root().unwrap().label(), "Plan a trip");
    assert_eq!(session.surface().structural(), vec![&Call::Render(5)]);

    let notes = session.take_notifications();
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert!(notes[0].message.contains("model overloaded"));
}

#[test]
fn click_on_a_leaf_expands_it_with_a_delta() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Budget", Ok(vec!["Flights".into(), "Hotels".into()]));
    let mut session = generated(gateway);

    let outcome = block_on(session.click(&id("n-5"))).unwrap();
    let inserted = match outcome {
        ClickOutcome::Expansion(ExpansionOutcome::Expanded(inserted)) => inserted,
        other => panic!("unexpected {other:?}"),
    };

    assert_eq!(inserted.added, vec![id("n-6"), id("n-7")]);
    assert_eq!(
        session.surface().structural(),
        vec![&Call::Render(5), &Call::ApplyDelta(inserted.added.clone())]
    );
    let node = session.tree().get(&id("n-5")).unwrap();
    assert!(node.is_expanded());
    assert!(!node.is_loading());
    assert_eq!(session.selected(), Some(&id("n-5")));

    let loading_seen = session.surface().calls.iter().any(|c| {
        matches!(c, Call::State(target, state) if target == &id("n-5") && state.loading)
    });
    assert!(loading_seen);
    assert_eq!(session.surface().last_state(&id("n-5")), Some(selected_only()));
    assert_eq!(session.take_notifications()[0].message, "Added 2 subtopics");
}

#[test]
fn click_on_an_expanded_node_only_selects() {
    let mut session = generated(ScriptedGateway::with_trip());
    let before = session.gateway().calls();

    assert_eq!(
        block_on(session.click(&id("n-2"))).unwrap(),
        ClickOutcome::Selected
    );
    assert_eq!(session.gateway().calls(), before);

    block_on(session.click(&id("n-1"))).unwrap();
    assert_eq!(
        session.surface().last_state(&id("n-2")),
        Some(NodeVisualState::default())
    );
    assert_eq!(session.surface().last_state(&id("n-1")), Some(selected_only()));
}

#[test]
fn empty_answer_leaves_the_node_retryable() {
    let mut session = generated(ScriptedGateway::with_trip());

    let outcome = block_on(session.click(&id("n-3"))).unwrap();
    assert_eq!(outcome, ClickOutcome::Expansion(ExpansionOutcome::NoResults));
    assert!(session.tree().is_retryable(&id("n-3")));
    assert_eq!(session.tree().children_of(&id("n-3")), &[] as &[NodeId]);
    let notes = session.take_notifications();
    assert_eq!(notes[0].message, "No subtopics were generated.");
    assert_eq!(notes[0].level, NotificationLevel::Warning);

    let calls = session.gateway().calls();
    block_on(session.click(&id("n-3"))).unwrap();
    assert_eq!(session.gateway().calls(), calls + 1);
}

#[test]
fn transport_failure_restores_retryable_state() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Beach", Err(transport("backend down")));
    let mut session = generated(gateway);

    let outcome = block_on(session.expand(&id("n-3"))).unwrap();
    assert!(matches!(outcome, ExpansionOutcome::Failed { .. }));
    assert!(session.tree().is_retryable(&id("n-3")));
    assert!(!session.surface().last_state(&id("n-3")).unwrap().loading);
    assert_eq!(session.surface().structural().len(), 1);

    let notes = session.take_notifications();
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert!(notes[0].message.starts_with("Error generating subtopics:"));
}

#[test]
fn second_expansion_of_a_loading_node_is_rejected() {
    let mut session = generated(ScriptedGateway::with_trip());
    let _ticket = session.start_expansion(&id("n-3")).unwrap();
    let calls = session.surface().calls.len();

    let err = session.start_expansion(&id("n-3")).unwrap_err();
    assert_eq!(
        err,
        SessionError::Model(mindsprout::Error::AlreadyInFlight { id: id("n-3") })
    );
    assert_eq!(session.surface().calls.len(), calls);
    assert_eq!(
        block_on(session.click(&id("n-3"))).unwrap(),
        ClickOutcome::Busy
    );
}

#[test]
fn concurrent_tickets_apply_in_any_order() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Beach", Ok(vec!["Snorkeling".into()]));
    gateway.answer("Mountains", Ok(vec!["Hiking".into(), "Skiing".into()]));
    let mut session = generated(gateway);

    let beach = session.start_expansion(&id("n-3")).unwrap();
    let mountains = session.start_expansion(&id("n-4")).unwrap();
    let beach_result = block_on(beach.fetch(session.gateway()));
    let mountains_result = block_on(mountains.fetch(session.gateway()));

    let first = session.finish_expansion(mountains, mountains_result).unwrap();
    let second = session.finish_expansion(beach, beach_result).unwrap();
    assert!(matches!(first, ExpansionOutcome::Expanded(ref i) if i.added.len() == 2));
    assert!(matches!(second, ExpansionOutcome::Expanded(ref i) if i.added.len() == 1));

    let tree = session.tree();
    assert_eq!(tree.len(), 8);
    for node in tree.nodes() {
        assert!(!node.is_loading());
        if let Some(parent) = node.parent() {
            assert_eq!(tree.get(parent).unwrap().depth() + 1, node.depth());
        }
    }
}

#[test]
fn expand_many_runs_every_ticket() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Beach", Ok(vec!["Snorkeling".into()]));
    gateway.answer("Budget", Ok(vec!["Flights".into()]));
    let mut session = generated(gateway);

    let results = block_on(session.expand_many(&[id("n-3"), id("ghost"), id("n-5")]));
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, id("ghost"));
    assert!(results[0].1.is_err());
    let expanded = results[1..]
        .iter()
        .filter(|(_, r)| matches!(r, Ok(ExpansionOutcome::Expanded(_))))
        .count();
    assert_eq!(expanded, 2);
    assert_eq!(session.tree().len(), 7);
}

#[test]
fn responses_after_reset_are_discarded() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Budget", Ok(vec!["Flights".into()]));
    let mut session = generated(gateway);

    let ticket = session.start_expansion(&id("n-5")).unwrap();
    let result = block_on(ticket.fetch(session.gateway()));
    session.reset().unwrap();

    assert_eq!(
        session.finish_expansion(ticket, result).unwrap(),
        ExpansionOutcome::Discarded
    );
    assert!(session.tree().is_empty());
    assert_eq!(
        session.surface().structural(),
        vec![&Call::Render(5), &Call::Render(0)]
    );
}

#[test]
fn responses_for_a_replaced_tree_are_discarded() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Budget", Ok(vec!["Flights".into()]));
    let mut session = generated(gateway);

    let ticket = session.start_expansion(&id("n-5")).unwrap();
    let result = block_on(ticket.fetch(session.gateway()));
    block_on(session.generate("Plan a trip")).unwrap();

    assert_eq!(
        session.finish_expansion(ticket, result).unwrap(),
        ExpansionOutcome::Discarded
    );
    assert_eq!(session.tree().len(), 5);
}

#[test]
fn responses_are_discarded_when_a_new_tree_reuses_the_node_id() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Budget", Ok(vec!["Flights".into()]));
    let mut session = generated(gateway);

    let ticket = session.start_expansion(&id("n-5")).unwrap();
    let result = block_on(ticket.fetch(session.gateway()));
    session.gateway().set_tree(Ok(GeneratedTree {
        central: "Plan a trip".to_string(),
        subtopics: vec![SubtopicEntry::Topic {
            label: "Budget".to_string(),
            id: Some("n-5".to_string()),
            children: Vec::new(),
        }],
    }));
    block_on(session.generate("Plan a trip")).unwrap();
    assert!(session.tree().contains(&id("n-5")));

    assert_eq!(
        session.finish_expansion(ticket, result).unwrap(),
        ExpansionOutcome::Discarded
    );
    assert!(session.tree().children_of(&id("n-5")).is_empty());
    assert!(session.tree().is_retryable(&id("n-5")));
}

#[test]
fn responses_for_a_deleted_node_are_discarded() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Beach", Ok(vec!["Snorkeling".into()]));
    let mut session = generated(gateway);

    let ticket = session.start_expansion(&id("n-3")).unwrap();
    session.delete(&id("n-2")).unwrap();
    let result = block_on(ticket.fetch(session.gateway()));

    assert_eq!(
        session.finish_expansion(ticket, result).unwrap(),
        ExpansionOutcome::Discarded
    );
    assert_eq!(session.tree().len(), 2);
}

#[test]
fn failing_surface_rolls_back_the_loading_flag() {
    let mut session = generated(ScriptedGateway::with_trip());
    session.surface_mut().fail_states = true;

    let err = session.start_expansion(&id("n-5")).unwrap_err();
    assert!(matches!(err, SessionError::Surface(_)));
    assert!(session.tree().is_retryable(&id("n-5")));
}

#[test]
fn editing_relabels_without_structural_calls() {
    let mut session = generated(ScriptedGateway::with_trip());
    assert_eq!(session.begin_edit(&id("n-5")).unwrap(), "Budget");

    session.confirm_edit(&id("n-5"), "  Travel budget ").unwrap();
    assert_eq!(session.tree().get(&id("n-5")).unwrap().label(), "Travel budget");
    assert_eq!(
        session.surface().calls.last(),
        Some(&Call::Label(id("n-5"), "Travel budget".to_string()))
    );
    assert_eq!(session.surface().structural().len(), 1);

    let err = session.confirm_edit(&id("n-5"), "   ").unwrap_err();
    assert_eq!(err, SessionError::Model(mindsprout::Error::InvalidLabel));
    assert_eq!(session.tree().get(&id("n-5")).unwrap().label(), "Travel budget");
    assert_eq!(
        session.take_notifications()[0].level,
        NotificationLevel::Warning
    );
}

#[test]
fn add_subtopic_defaults_to_the_root_and_selects_the_new_node() {
    let mut session = generated(ScriptedGateway::with_trip());

    let added = session.add_subtopic(None).unwrap();
    let node = session.tree().get(&added).unwrap();
    assert_eq!(node.label(), "New Subtopic");
    assert_eq!(node.parent(), Some(&id("n-1")));
    assert_eq!(session.selected(), Some(&added));
    assert_eq!(
        session.surface().structural().last(),
        Some(&&Call::ApplyDelta(vec![added.clone()]))
    );

    let notes = session.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Success);
    assert_eq!(notes[0].message, "New topic added. Edit the text now.");

    let nested = session.add_subtopic(Some("Packing list")).unwrap();
    assert_eq!(session.tree().get(&nested).unwrap().parent(), Some(&added));
    assert_eq!(session.tree().get(&nested).unwrap().depth(), 2);
}

#[test]
fn add_subtopic_needs_a_map() {
    let mut session = session(ScriptedGateway::with_trip());
    assert!(matches!(
        session.add_subtopic(None),
        Err(SessionError::Model(mindsprout::Error::InvalidInput { .. }))
    ));
}

#[test]
fn delete_removes_the_closure_and_clears_selection() {
    let mut session = generated(ScriptedGateway::with_trip());
    session.select(&id("n-3")).unwrap();

    let removed = session.delete(&id("n-2")).unwrap();
    assert_eq!(removed, vec![id("n-2"), id("n-3"), id("n-4")]);
    assert_eq!(session.selected(), None);
    assert_eq!(
        session.surface().structural().last(),
        Some(&&Call::Remove(removed.clone()))
    );
    assert_eq!(session.tree().len(), 2);
    assert_eq!(
        session.take_notifications(),
        vec![Notification {
            level: NotificationLevel::Success,
            message: "Topic deleted successfully".to_string(),
        }]
    );
}

#[test]
fn deleting_the_root_is_refused_with_a_warning() {
    let mut session = generated(ScriptedGateway::with_trip());
    session.select(&id("n-1")).unwrap();

    let err = session.delete_selected().unwrap_err();
    assert_eq!(err, SessionError::Model(mindsprout::Error::CannotDeleteRoot));
    assert_eq!(session.tree().len(), 5);
    let notes = session.take_notifications();
    assert_eq!(notes[0].message, "Cannot delete the central topic.");
    assert_eq!(notes[0].level, NotificationLevel::Warning);

    session.deselect().unwrap();
    assert!(session.delete_selected().is_err());
}

#[test]
fn toggling_subtopics_dims_only_added_topics() {
    let gateway = ScriptedGateway::with_trip();
    gateway.answer("Budget", Ok(vec!["Flights".into()]));
    let mut session = generated(gateway);
    block_on(session.expand(&id("n-5"))).unwrap();
    let manual = session.add_subtopic(Some("Notes")).unwrap();

    assert!(!session.toggle_subtopics().unwrap());
    assert!(session.surface().last_state(&id("n-6")).unwrap().dimmed);
    assert!(session.surface().last_state(&manual).unwrap().dimmed);
    assert!(
        !session
            .surface()
            .last_state(&id("n-5"))
            .unwrap_or_default()
            .dimmed
    );

    assert!(session.toggle_subtopics().unwrap());
    assert!(!session.surface().last_state(&id("n-6")).unwrap().dimmed);
}

#[test]
fn offline_session_keeps_the_svg_surface_in_sync() {
    let mut session = Session::with_tree(
        TopicTree::with_id_source(IdSource::sequential("n")),
        OfflineGateway::new(),
        SvgSurface::default(),
    );
    block_on(session.generate("Build a website")).unwrap();
    assert_eq!(session.surface().element_count(), session.tree().len());
    assert_eq!(session.surface().layout_runs(), 1);

    let leaf = session
        .tree()
        .nodes()
        .find(|n| n.children().is_empty())
        .map(|n| n.id().clone())
        .unwrap();
    let outcome = block_on(session.click(&leaf)).unwrap();
    assert!(matches!(
        outcome,
        ClickOutcome::Expansion(ExpansionOutcome::Expanded(_))
    ));
    assert_eq!(session.surface().element_count(), session.tree().len());
    assert_eq!(session.surface().connector_count(), session.tree().len() - 1);
    assert_eq!(session.surface().layout_runs(), 2);

    // The short label shrinks the box, so the surface lays the tree out again.
    session.confirm_edit(&leaf, "Renamed").unwrap();
    assert_eq!(session.surface().layout_runs(), 3);
    assert!(session.surface().to_svg().contains(">Renamed</tspan>"));

    let removed = session.delete(&leaf).unwrap();
    assert!(removed.len() > 1);
    assert_eq!(session.surface().element_count(), session.tree().len());
    assert_eq!(session.surface().layout_runs(), 4);
}
