/// Project-wide registry of wrapped generators and plain tasks
///
/// Resolves invocable names to targets, orders them, and runs the gated
/// load → generate → and-then → save pipeline for each wrapped generator.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::task::{Generator, Task, TaskOutcome, TaskRef, WrapperOptions};
use super::wrapper::{LoadOutcome, TaskNames, WrappedGenerator};
use crate::checksum::{ChecksumComputer, ChecksumStore, FingerprintMap};
use crate::error::{GensumError, Result};

/// Name of the verification phase that runs every checksum check
pub const CHECK_PHASE: &str = "check";

/// Default checksum directory, relative to the project root
pub const DEFAULT_CHECKSUMS_DIR: &str = "generation/checksums";

/// Build-wide settings injected into the project
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub checksums_dir: PathBuf,
    /// Run gated work even when checksums match
    pub force_rerun: bool,
}

impl Settings {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let checksums_dir = project_root.join(DEFAULT_CHECKSUMS_DIR);
        Self {
            project_root,
            checksums_dir,
            force_rerun: false,
        }
    }

    /// Checksum directory relative to the project root
    pub fn with_checksums_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.checksums_dir = self.project_root.join(dir);
        self
    }

    pub fn with_force_rerun(mut self, force_rerun: bool) -> Self {
        self.force_rerun = force_rerun;
        self
    }
}

/// A resolved invocable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The facade running the whole gated pipeline
    Regenerate(String),
    Load(String),
    Save(String),
    Check(String),
    Task(String),
    CheckPhase,
}

impl Target {
    fn generator_base(&self) -> Option<&str> {
        match self {
            Target::Regenerate(base)
            | Target::Load(base)
            | Target::Save(base)
            | Target::Check(base) => Some(base),
            Target::Task(_) | Target::CheckPhase => None,
        }
    }

    /// Position within a generator's pipeline
    fn pipeline_rank(&self) -> Option<u8> {
        match self {
            Target::Load(_) => Some(0),
            Target::Regenerate(_) => Some(1),
            Target::Save(_) => Some(2),
            Target::Check(_) => Some(3),
            Target::Task(_) | Target::CheckPhase => None,
        }
    }

    /// Whether this target can change generated files or the baseline
    fn mutates(&self) -> bool {
        matches!(self, Target::Regenerate(_) | Target::Save(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Regenerate(base) => write!(f, "{}", TaskNames::new(base).facade),
            Target::Load(base) => write!(f, "{}", TaskNames::new(base).load),
            Target::Save(base) => write!(f, "{}", TaskNames::new(base).save),
            Target::Check(base) => write!(f, "{}", TaskNames::new(base).check),
            Target::Task(name) => write!(f, "{}", name),
            Target::CheckPhase => write!(f, "{}", CHECK_PHASE),
        }
    }
}

/// Summary of one facade invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateReport {
    pub base_name: String,
    pub checksum_match: bool,
    /// Whether the gate was open and the pipeline executed
    pub ran: bool,
    pub did_work: bool,
}

pub struct Project {
    settings: Settings,
    computer: ChecksumComputer,
    store: ChecksumStore,
    tasks: BTreeMap<String, Box<dyn Task>>,
    generators: BTreeMap<String, WrappedGenerator>,
}

impl Project {
    pub fn new(settings: Settings) -> Self {
        let computer = ChecksumComputer::new(&settings.project_root);
        let store = ChecksumStore::new(&settings.checksums_dir);
        Self {
            settings,
            computer,
            store,
            tasks: BTreeMap::new(),
            generators: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ChecksumStore {
        &self.store
    }

    pub fn computer(&self) -> &ChecksumComputer {
        &self.computer
    }

    /// Register a plain task
    pub fn register_task(&mut self, task: Box<dyn Task>) -> Result<()> {
        let name = task.name().to_string();
        if self.is_taken(&name) {
            return Err(GensumError::DuplicateTask(name));
        }
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Wrap a generator with checksum load/save/check units
    ///
    /// Every task referenced by `and_then` or `ignore_with_source` must
    /// already be registered.
    pub fn wrap(
        &mut self,
        generator: Box<dyn Generator>,
        options: WrapperOptions,
    ) -> Result<TaskNames> {
        let wrapped = WrappedGenerator::new(generator, options)?;

        for name in wrapped.names().all() {
            if self.is_taken(name) {
                return Err(GensumError::DuplicateTask(name.to_string()));
            }
        }

        for task in wrapped
            .options()
            .and_then
            .iter()
            .chain(&wrapped.options().ignore_with_source)
        {
            if !self.tasks.contains_key(task.name()) {
                return Err(GensumError::UnknownTask(task.name().to_string()));
            }
        }

        let names = wrapped.names().clone();
        debug!(task = %names.facade, "wrapped generator");
        self.generators.insert(names.facade.clone(), wrapped);
        Ok(names)
    }

    /// Check that every `must_run_before` name resolves to a target
    pub fn validate_references(&self) -> Result<()> {
        for wrapped in self.generators.values() {
            for name in &wrapped.options().must_run_before {
                self.resolve(name)?;
            }
        }
        Ok(())
    }

    fn is_taken(&self, name: &str) -> bool {
        name == CHECK_PHASE
            || self.tasks.contains_key(name)
            || self
                .generators
                .values()
                .any(|g| g.names().all().contains(&name))
    }

    /// Every invocable name, sorted
    pub fn task_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.tasks.keys().cloned().collect();
        for wrapped in self.generators.values() {
            names.extend(wrapped.names().all().iter().map(|n| n.to_string()));
        }
        names.insert(CHECK_PHASE.to_string());
        names.into_iter().collect()
    }

    pub fn generator_names(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }

    /// Map an invocable name to its target
    pub fn resolve(&self, name: &str) -> Result<Target> {
        if name == CHECK_PHASE {
            return Ok(Target::CheckPhase);
        }
        if self.tasks.contains_key(name) {
            return Ok(Target::Task(name.to_string()));
        }
        for (base, wrapped) in &self.generators {
            let names = wrapped.names();
            if name == names.facade {
                return Ok(Target::Regenerate(base.clone()));
            } else if name == names.load {
                return Ok(Target::Load(base.clone()));
            } else if name == names.save {
                return Ok(Target::Save(base.clone()));
            } else if name == names.check {
                return Ok(Target::Check(base.clone()));
            }
        }
        Err(GensumError::UnknownTask(name.to_string()))
    }

    /// Resolve, de-duplicate and order requested names
    ///
    /// Units of one generator run as load, facade, save, check. A wrapped
    /// generator's facade and save also precede any requested name listed in
    /// its `must_run_before` and the check phase. Other targets keep request
    /// order.
    pub fn plan(&self, names: &[String]) -> Result<Vec<Target>> {
        let mut targets: Vec<Target> = Vec::new();
        for name in names {
            let target = self.resolve(name)?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        let count = targets.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut indegree = vec![0usize; count];

        for (i, target) in targets.iter().enumerate() {
            let (Some(base), Some(rank)) = (target.generator_base(), target.pipeline_rank()) else {
                continue;
            };
            let must_run_before = &self.generators[base].options().must_run_before;

            for (j, other) in targets.iter().enumerate() {
                if i == j {
                    continue;
                }
                // Units of one generator keep load, generate, save, check order
                let same_pipeline = other.generator_base() == Some(base)
                    && other.pipeline_rank().is_some_and(|r| rank < r);
                let downstream = target.mutates()
                    && (must_run_before.contains(&other.to_string())
                        || *other == Target::CheckPhase);
                if same_pipeline || downstream {
                    successors[i].push(j);
                    indegree[j] += 1;
                }
            }
        }

        let mut ordered = Vec::with_capacity(count);
        let mut done = vec![false; count];
        while ordered.len() < count {
            let next = (0..count).find(|&i| !done[i] && indegree[i] == 0);
            let Some(i) = next else {
                let remaining: Vec<String> = (0..count)
                    .filter(|&i| !done[i])
                    .map(|i| targets[i].to_string())
                    .collect();
                return Err(GensumError::OrderingCycle(remaining.join(", ")));
            };
            done[i] = true;
            for &j in &successors[i] {
                indegree[j] -= 1;
            }
            ordered.push(targets[i].clone());
        }

        Ok(ordered)
    }

    /// Run the requested names in planned order, stopping at the first failure
    pub fn execute(&mut self, names: &[String]) -> Result<Vec<Target>> {
        let plan = self.plan(names)?;
        for target in &plan {
            self.run_target(target)?;
        }
        Ok(plan)
    }

    fn run_target(&mut self, target: &Target) -> Result<()> {
        match target {
            Target::Regenerate(base) => {
                self.regenerate(base)?;
            }
            Target::Load(base) => {
                let load = self.checksum_load(base)?;
                info!(
                    operation = "load",
                    task = %target,
                    checksum_match = load.checksum_match,
                    "checksums {}",
                    if load.checksum_match { "match" } else { "differ" }
                );
            }
            Target::Save(base) => {
                self.checksum_save(base)?;
            }
            Target::Check(base) => self.checksum_check(base)?,
            Target::Task(name) => {
                self.run_task(name)?;
            }
            Target::CheckPhase => self.check_all()?,
        }
        Ok(())
    }

    fn wrapped(&self, base: &str) -> Result<&WrappedGenerator> {
        self.generators
            .get(base)
            .ok_or_else(|| GensumError::UnknownTask(base.to_string()))
    }

    pub fn checksum_load(&self, base: &str) -> Result<LoadOutcome> {
        self.wrapped(base)?.checksum_load(&self.computer, &self.store)
    }

    pub fn checksum_save(&self, base: &str) -> Result<FingerprintMap> {
        self.wrapped(base)?.checksum_save(&self.computer, &self.store)
    }

    pub fn checksum_check(&self, base: &str) -> Result<()> {
        self.wrapped(base)?.checksum_check(&self.computer, &self.store)
    }

    /// The facade: load, then generate, run and-then tasks and save only
    /// when checksums changed or a re-run is forced
    pub fn regenerate(&mut self, base: &str) -> Result<RegenerateReport> {
        let Project {
            settings,
            computer,
            store,
            tasks,
            generators,
        } = self;

        let wrapped = generators
            .get_mut(base)
            .ok_or_else(|| GensumError::UnknownTask(base.to_string()))?;
        let load = wrapped.checksum_load(computer, store)?;
        let run = !load.checksum_match || settings.force_rerun;

        let siblings = wrapped.options().ignore_with_source.clone();
        let and_then = wrapped.options().and_then.clone();

        let mut outcome = TaskOutcome::NoWork;
        if run {
            if load.checksum_match {
                info!(task = base, "checksums match, re-running because a re-run was forced");
            } else {
                info!(task = base, "checksums changed, regenerating");
            }

            for sibling in &siblings {
                run_plain(tasks, sibling)?;
            }

            outcome = wrapped.generator_mut().execute()?;

            for task in &and_then {
                run_plain(tasks, task)?;
            }

            wrapped.checksum_save(computer, store)?;
        } else {
            for sibling in &siblings {
                debug!(task = %sibling, status = "skipped", "checksums match");
            }
        }

        if !run && !outcome.did_work() {
            info!(
                task = base,
                status = "skipped",
                "generation skipped because checksums did not change (use --rerun-tasks to force)"
            );
        }

        Ok(RegenerateReport {
            base_name: base.to_string(),
            checksum_match: load.checksum_match,
            ran: run,
            did_work: outcome.did_work(),
        })
    }

    /// Run a plain task; tasks gated by a generator obey that generator's load
    pub fn run_task(&mut self, name: &str) -> Result<TaskOutcome> {
        if !self.tasks.contains_key(name) {
            return Err(GensumError::UnknownTask(name.to_string()));
        }

        let owners: Vec<&WrappedGenerator> = self
            .generators
            .values()
            .filter(|g| g.options().gates(name))
            .collect();

        if !owners.is_empty() && !self.settings.force_rerun {
            let mut open = false;
            for owner in owners {
                if !owner.checksum_load(&self.computer, &self.store)?.checksum_match {
                    open = true;
                    break;
                }
            }
            if !open {
                info!(task = name, status = "skipped", "task skipped because checksums did not change");
                return Ok(TaskOutcome::NoWork);
            }
        }

        run_plain(&mut self.tasks, &TaskRef::new(name))
    }

    /// Verification phase: every checksum check, reporting all drift
    pub fn check_all(&self) -> Result<()> {
        let mut reports = Vec::new();

        for wrapped in self.generators.values() {
            match wrapped.checksum_check(&self.computer, &self.store) {
                Ok(()) => {}
                Err(GensumError::Drift(report)) => {
                    error!(task = %wrapped.names().check, status = "error", "{}", report);
                    reports.push(*report);
                }
                Err(e) => return Err(e),
            }
        }

        if reports.is_empty() {
            info!(
                operation = "check",
                entry_count = self.generators.len(),
                "all checksums match"
            );
            Ok(())
        } else {
            Err(GensumError::VerificationFailed { reports })
        }
    }

    fn stale_base_names(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|base| !self.generators.contains_key(base))
            .collect())
    }

    /// Checksum files that no registered generator owns
    pub fn stale_checksum_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .stale_base_names()?
            .iter()
            .map(|base| self.store.path_for(base))
            .collect())
    }

    /// Remove stale checksum files, returning what was (or would be) removed
    pub fn prune(&self, dry_run: bool) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for base in self.stale_base_names()? {
            let path = self.store.path_for(&base);
            if !dry_run {
                self.store.remove(&base)?;
                info!(operation = "prune", path = %path.display(), "removed stale checksum file");
            }
            removed.push(path);
        }
        Ok(removed)
    }
}

fn run_plain(tasks: &mut BTreeMap<String, Box<dyn Task>>, task: &TaskRef) -> Result<TaskOutcome> {
    let runnable = tasks
        .get_mut(task.name())
        .ok_or_else(|| GensumError::UnknownTask(task.name().to_string()))?;
    debug!(task = %task, "executing task");
    runnable.execute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{InputProperty, PropertyValue};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Generator that writes `content` into its single output file
    struct FakeGenerator {
        name: String,
        properties: Vec<InputProperty>,
        input: PathBuf,
        output: PathBuf,
        content: Arc<Mutex<String>>,
        journal: Journal,
    }

    impl Task for FakeGenerator {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute(&mut self) -> Result<TaskOutcome> {
            self.journal.lock().unwrap().push(self.name.clone());
            fs::write(&self.output, self.content.lock().unwrap().as_bytes())
                .map_err(|e| GensumError::io("write", &self.output, e))?;
            Ok(TaskOutcome::DidWork)
        }
    }

    impl Generator for FakeGenerator {
        fn input_properties(&self) -> &[InputProperty] {
            &self.properties
        }

        fn input_files(&self) -> Result<Vec<PathBuf>> {
            Ok(vec![self.input.clone()])
        }

        fn output_files(&self) -> Result<Vec<PathBuf>> {
            Ok(vec![self.output.clone()])
        }
    }

    struct RecordingTask {
        name: String,
        journal: Journal,
    }

    impl Task for RecordingTask {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute(&mut self) -> Result<TaskOutcome> {
            self.journal.lock().unwrap().push(self.name.clone());
            Ok(TaskOutcome::DidWork)
        }
    }

    struct Fixture {
        temp: TempDir,
        journal: Journal,
        content: Arc<Mutex<String>>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("grammar.g"), "rules").unwrap();
            Self {
                temp,
                journal: Arc::new(Mutex::new(Vec::new())),
                content: Arc::new(Mutex::new("generated v1".to_string())),
            }
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn generator(&self, name: &str) -> Box<dyn Generator> {
            self.generator_with(name, vec![InputProperty::new("version", "1")])
        }

        fn generator_with(&self, name: &str, properties: Vec<InputProperty>) -> Box<dyn Generator> {
            Box::new(FakeGenerator {
                name: name.to_string(),
                properties,
                input: PathBuf::from("grammar.g"),
                output: self.root().join(format!("{}.out", name)),
                content: self.content.clone(),
                journal: self.journal.clone(),
            })
        }

        fn task(&self, name: &str) -> Box<dyn Task> {
            Box::new(RecordingTask {
                name: name.to_string(),
                journal: self.journal.clone(),
            })
        }

        fn project(&self, force_rerun: bool) -> Project {
            let mut project =
                Project::new(Settings::new(self.root()).with_force_rerun(force_rerun));
            project.register_task(self.task("format")).unwrap();
            project.register_task(self.task("download")).unwrap();
            project.register_task(self.task("compile")).unwrap();
            project
                .wrap(
                    self.generator("generateLexerInternal"),
                    WrapperOptions {
                        and_then: vec![TaskRef::from("format")],
                        ignore_with_source: vec![TaskRef::from("download")],
                        must_run_before: vec!["compile".to_string()],
                    },
                )
                .unwrap();
            project
        }

        fn journal(&self) -> Vec<String> {
            self.journal.lock().unwrap().clone()
        }

        fn clear_journal(&self) {
            self.journal.lock().unwrap().clear();
        }
    }

    #[test]
    fn test_first_run_generates_and_saves() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);

        let load = project.checksum_load("generateLexer").unwrap();
        assert!(!load.checksum_match);
        assert!(load.previous.is_empty());
        assert_eq!(load.current.get("generateLexerInternal.out"), Some("--"));

        let report = project.regenerate("generateLexer").unwrap();
        assert!(report.ran);
        assert!(report.did_work);
        assert_eq!(
            fixture.journal(),
            vec!["download", "generateLexerInternal", "format"]
        );

        let saved = project.store().load("generateLexer").unwrap();
        let current = project.checksum_load("generateLexer").unwrap();
        assert!(current.checksum_match);
        assert_eq!(saved, current.current);
        assert_ne!(saved.get("generateLexerInternal.out"), Some("--"));
    }

    #[test]
    fn test_matching_checksums_skip_generator_and_siblings() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project.regenerate("generateLexer").unwrap();
        fixture.clear_journal();

        let report = project.regenerate("generateLexer").unwrap();

        assert!(report.checksum_match);
        assert!(!report.ran);
        assert!(!report.did_work);
        assert!(fixture.journal().is_empty());
        project.checksum_check("generateLexer").unwrap();
    }

    #[test]
    fn test_force_rerun_runs_despite_match() {
        let fixture = Fixture::new();
        fixture.project(false).regenerate("generateLexer").unwrap();
        fixture.clear_journal();

        let mut project = fixture.project(true);
        let report = project.regenerate("generateLexer").unwrap();

        assert!(report.checksum_match);
        assert!(report.ran);
        assert_eq!(
            fixture.journal(),
            vec!["download", "generateLexerInternal", "format"]
        );
    }

    #[test]
    fn test_changed_input_triggers_regeneration() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project.regenerate("generateLexer").unwrap();
        fixture.clear_journal();

        fs::write(fixture.root().join("grammar.g"), "new rules").unwrap();
        *fixture.content.lock().unwrap() = "generated v2".to_string();

        let report = project.regenerate("generateLexer").unwrap();
        assert!(report.ran);
        assert_eq!(fixture.journal().len(), 3);

        let saved = project.store().load("generateLexer").unwrap();
        let generator = project.wrapped("generateLexer").unwrap().generator();
        assert_eq!(saved, project.computer().compute(generator).unwrap());
    }

    #[test]
    fn test_hand_edited_output_fails_check() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project.regenerate("generateLexer").unwrap();
        let saved_hash = project
            .store()
            .load("generateLexer")
            .unwrap()
            .get("generateLexerInternal.out")
            .unwrap()
            .to_string();

        fs::write(fixture.root().join("generateLexerInternal.out"), "edited").unwrap();

        let report = match project.checksum_check("generateLexer") {
            Err(GensumError::Drift(report)) => report,
            other => panic!("expected drift, got {:?}", other),
        };
        let current_hash = report.diff.only_in_current.get("generateLexerInternal.out").unwrap();
        assert_ne!(current_hash, saved_hash);
        assert_eq!(
            report.diff.only_in_previous.get("generateLexerInternal.out"),
            Some(saved_hash.as_str())
        );
        assert_eq!(report.diff.only_in_current.len(), 1);
        assert_eq!(report.output_files, vec!["generateLexerInternal.out"]);
        assert_eq!(report.input_files, vec!["grammar.g"]);

        // Checking never touches the baseline
        assert_eq!(
            project.store().load("generateLexer").unwrap().get("generateLexerInternal.out"),
            Some(saved_hash.as_str())
        );
    }

    #[test]
    fn test_check_all_collects_every_drift() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project
            .wrap(fixture.generator("generateTablesInternal"), WrapperOptions::default())
            .unwrap();
        project.regenerate("generateLexer").unwrap();

        // generateTables never saved a baseline
        let err = project.check_all().unwrap_err();
        match err {
            GensumError::VerificationFailed { reports } => {
                assert_eq!(reports.len(), 1);
                assert_eq!(reports[0].base_name, "generateTables");
            }
            other => panic!("unexpected error: {other}"),
        }

        project.regenerate("generateTables").unwrap();
        project.check_all().unwrap();
    }

    #[test]
    fn test_wrap_rejects_missing_suffix() {
        let fixture = Fixture::new();
        let mut project = Project::new(Settings::new(fixture.root()));

        let err = project
            .wrap(fixture.generator("generateLexer"), WrapperOptions::default())
            .unwrap_err();
        assert!(matches!(err, GensumError::MissingSuffix { .. }));
    }

    #[test]
    fn test_wrap_rejects_unknown_and_then_task() {
        let fixture = Fixture::new();
        let mut project = Project::new(Settings::new(fixture.root()));

        let err = project
            .wrap(
                fixture.generator("generateLexerInternal"),
                WrapperOptions {
                    and_then: vec![TaskRef::from("missing")],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, GensumError::UnknownTask(name) if name == "missing"));
    }

    #[test]
    fn test_wrap_rejects_name_collision() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);

        let err = project.register_task(fixture.task("generateLexerChecksumSave"));
        assert!(matches!(err, Err(GensumError::DuplicateTask(_))));
        assert!(project.register_task(fixture.task("check")).is_err());
    }

    #[test]
    fn test_task_names_include_synthesized_units() {
        let fixture = Fixture::new();
        let project = fixture.project(false);

        assert_eq!(
            project.task_names(),
            vec![
                "check",
                "compile",
                "download",
                "format",
                "generateLexer",
                "generateLexerChecksumCheck",
                "generateLexerChecksumLoad",
                "generateLexerChecksumSave",
            ]
        );
    }

    #[test]
    fn test_plan_respects_must_run_before() {
        let fixture = Fixture::new();
        let project = fixture.project(false);

        let plan = project
            .plan(&[
                "compile".to_string(),
                "generateLexerChecksumCheck".to_string(),
                "generateLexer".to_string(),
                "compile".to_string(),
            ])
            .unwrap();

        assert_eq!(
            plan,
            vec![
                Target::Regenerate("generateLexer".to_string()),
                Target::Task("compile".to_string()),
                Target::Check("generateLexer".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_detects_cycles() {
        let fixture = Fixture::new();
        let mut project = Project::new(Settings::new(fixture.root()));
        project
            .wrap(
                fixture.generator("generateAInternal"),
                WrapperOptions {
                    must_run_before: vec!["generateB".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();
        project
            .wrap(
                fixture.generator("generateBInternal"),
                WrapperOptions {
                    must_run_before: vec!["generateA".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();
        project.validate_references().unwrap();

        let result = project.plan(&["generateA".to_string(), "generateB".to_string()]);
        assert!(matches!(result, Err(GensumError::OrderingCycle(_))));
    }

    #[test]
    fn test_validate_references_rejects_unknown_downstream() {
        let fixture = Fixture::new();
        let mut project = Project::new(Settings::new(fixture.root()));
        project
            .wrap(
                fixture.generator("generateAInternal"),
                WrapperOptions {
                    must_run_before: vec!["nowhere".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(matches!(
            project.validate_references(),
            Err(GensumError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_sibling_invoked_directly_obeys_gate() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);

        // No baseline yet, so the gate is open
        assert_eq!(project.run_task("download").unwrap(), TaskOutcome::DidWork);

        project.regenerate("generateLexer").unwrap();
        fixture.clear_journal();

        assert_eq!(project.run_task("download").unwrap(), TaskOutcome::NoWork);
        assert_eq!(project.run_task("compile").unwrap(), TaskOutcome::DidWork);
        assert_eq!(fixture.journal(), vec!["compile"]);
    }

    #[test]
    fn test_execute_runs_save_then_check() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);

        let executed = project
            .execute(&[
                "generateLexerChecksumCheck".to_string(),
                "generateLexerChecksumSave".to_string(),
            ])
            .unwrap();

        assert_eq!(
            executed,
            vec![
                Target::Save("generateLexer".to_string()),
                Target::Check("generateLexer".to_string()),
            ]
        );
        // Save alone never runs the generator
        assert!(fixture.journal().is_empty());
    }

    #[test]
    fn test_pipeline_units_keep_order_regardless_of_request_order() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project.regenerate("generateLexer").unwrap();

        fs::write(fixture.root().join("grammar.g"), "new rules").unwrap();
        *fixture.content.lock().unwrap() = "generated v2".to_string();
        fixture.clear_journal();

        let executed = project
            .execute(&[
                "generateLexerChecksumSave".to_string(),
                "generateLexerChecksumCheck".to_string(),
                "generateLexer".to_string(),
                "generateLexerChecksumLoad".to_string(),
            ])
            .unwrap();

        assert_eq!(
            executed,
            vec![
                Target::Load("generateLexer".to_string()),
                Target::Regenerate("generateLexer".to_string()),
                Target::Save("generateLexer".to_string()),
                Target::Check("generateLexer".to_string()),
            ]
        );
        assert_eq!(
            fixture.journal(),
            vec!["download", "generateLexerInternal", "format"]
        );
        assert_eq!(
            fs::read_to_string(fixture.root().join("generateLexerInternal.out")).unwrap(),
            "generated v2"
        );

        // The baseline now records the regenerated output, so a later edit is caught
        fs::write(fixture.root().join("generateLexerInternal.out"), "edited").unwrap();
        assert!(matches!(
            project.checksum_check("generateLexer"),
            Err(GensumError::Drift(_))
        ));
    }

    #[test]
    fn test_changed_property_reopens_gate() {
        let fixture = Fixture::new();
        let flavor = Arc::new(Mutex::new("fast".to_string()));

        let project_with = |version: &str| {
            let flavor = flavor.clone();
            let mut project = Project::new(Settings::new(fixture.root()));
            project
                .wrap(
                    fixture.generator_with(
                        "generateLexerInternal",
                        vec![
                            InputProperty::new("version", version),
                            InputProperty::new(
                                "flavor",
                                PropertyValue::deferred(move || flavor.lock().unwrap().clone()),
                            ),
                        ],
                    ),
                    WrapperOptions::default(),
                )
                .unwrap();
            project
        };

        assert!(project_with("1").regenerate("generateLexer").unwrap().ran);
        assert!(!project_with("1").regenerate("generateLexer").unwrap().ran);

        // Literal value edited
        let report = project_with("2").regenerate("generateLexer").unwrap();
        assert!(report.ran);
        assert!(!report.checksum_match);
        assert_eq!(
            project_with("2")
                .store()
                .load("generateLexer")
                .unwrap()
                .get("property:version"),
            Some("2")
        );

        // Deferred value changed between runs
        *flavor.lock().unwrap() = "small".to_string();
        assert!(project_with("2").regenerate("generateLexer").unwrap().ran);
        assert!(!project_with("2").regenerate("generateLexer").unwrap().ran);
    }

    #[test]
    fn test_malformed_baseline_fails_facade_and_check() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        let path = project.store().path_for("generateLexer");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            project.regenerate("generateLexer"),
            Err(GensumError::MalformedChecksums { .. })
        ));
        assert!(fixture.journal().is_empty());
        assert!(matches!(
            project.check_all(),
            Err(GensumError::MalformedChecksums { .. })
        ));
    }

    #[test]
    fn test_prune_removes_only_stale_files() {
        let fixture = Fixture::new();
        let mut project = fixture.project(false);
        project.regenerate("generateLexer").unwrap();
        project
            .store()
            .save("generateRemoved", &FingerprintMap::new())
            .unwrap();

        let stale = project.prune(true).unwrap();
        assert_eq!(stale.len(), 1);
        assert!(stale[0].exists());

        let removed = project.prune(false).unwrap();
        assert!(!removed[0].exists());
        assert_eq!(project.store().list().unwrap(), vec!["generateLexer"]);
    }
}
