use serial_test::serial;

use cc_switch_tui::{AppError, TemplateCategory, TemplateService};

#[path = "support.rs"]
mod support;
use support::TestHome;

#[test]
#[serial]
fn built_ins_are_listed_and_protected() {
    let _home = TestHome::new();
    let templates = TemplateService::list(TemplateCategory::AgentsMd).expect("list");
    let built_in = templates
        .iter()
        .find(|t| t.built_in)
        .expect("a built-in AGENTS.md template");
    assert!(TemplateService::delete(&built_in.id).is_err());
}

#[test]
#[serial]
fn add_from_file_then_diff_and_apply() {
    let home = TestHome::new();
    let source = home.path().join("notes.md");
    std::fs::write(&source, "# Rules\n- be brief\n").expect("source");

    let template =
        TemplateService::add_from_file("Brief", TemplateCategory::ClaudeMd, &source).expect("add");
    assert!(!template.built_in);
    assert_eq!(
        TemplateService::get(&template.id).expect("get").map(|t| t.name),
        Some("Brief".to_string())
    );

    let project = home.path().join("project");
    std::fs::create_dir_all(&project).expect("project dir");
    let targets = TemplateService::targets_in(TemplateCategory::ClaudeMd, &project);
    assert_eq!(targets.len(), 2);
    let target = targets
        .iter()
        .find(|t| t.path.starts_with(&project))
        .expect("project target");
    assert!(!target.exists);
    assert!(target.path.ends_with("CLAUDE.md"));

    let diff = TemplateService::diff(&template, &target.path).expect("diff");
    assert!(diff.contains("+# Rules"));

    TemplateService::apply(&template, &target.path).expect("apply");
    assert_eq!(
        std::fs::read_to_string(&target.path).expect("applied"),
        "# Rules\n- be brief\n"
    );
    assert_eq!(TemplateService::diff(&template, &target.path).expect("diff"), "");
}

#[test]
#[serial]
fn user_templates_can_be_deleted() {
    let _home = TestHome::new();
    let template = TemplateService::add("Scratch", TemplateCategory::GeminiMd, "x\n".into())
        .expect("add");
    TemplateService::delete(&template.id).expect("delete");
    assert!(matches!(
        TemplateService::delete(&template.id),
        Err(AppError::NotFound(_))
    ));
    assert!(TemplateService::list(TemplateCategory::GeminiMd)
        .expect("list")
        .iter()
        .all(|t| t.id != template.id));
}
