use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::app_config::AppType;
use crate::config::{get_templates_path, read_json_file_opt, read_text_file_opt, write_json_file};
use crate::error::AppError;

/// Which guidance file a template is written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateCategory {
    #[default]
    ClaudeMd,
    AgentsMd,
    GeminiMd,
}

impl TemplateCategory {
    pub fn for_app(app: AppType) -> Self {
        match app {
            AppType::Claude => TemplateCategory::ClaudeMd,
            AppType::Codex => TemplateCategory::AgentsMd,
            AppType::Gemini => TemplateCategory::GeminiMd,
        }
    }

    pub fn app(self) -> AppType {
        match self {
            TemplateCategory::ClaudeMd => AppType::Claude,
            TemplateCategory::AgentsMd => AppType::Codex,
            TemplateCategory::GeminiMd => AppType::Gemini,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateCategory::ClaudeMd => "CLAUDE.md",
            TemplateCategory::AgentsMd => "AGENTS.md",
            TemplateCategory::GeminiMd => "GEMINI.md",
        }
    }

    fn global_dir(self) -> PathBuf {
        match self {
            TemplateCategory::ClaudeMd => crate::config::get_claude_config_dir(),
            TemplateCategory::AgentsMd => crate::config::get_codex_config_dir(),
            TemplateCategory::GeminiMd => crate::config::get_gemini_config_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: TemplateCategory,
    pub content: String,
    #[serde(default)]
    pub built_in: bool,
}

/// A file a template can be applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTarget {
    pub path: PathBuf,
    pub label: String,
    pub exists: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: Vec<Template>,
}

const GENERAL_GUIDE: &str = "# Project Guide

## Conventions
- Keep changes small and focused.
- Run the test suite before committing.
- Prefer editing existing files over creating new ones.
";

const REVIEW_GUIDE: &str = "# Review Checklist

- Does the change do what the commit message says?
- Are errors propagated instead of swallowed?
- Are new code paths covered by tests?
- Is any dead code left behind?
";

const BUILT_INS: [(&str, &str, &str); 2] = [
    ("general", "General project guide", GENERAL_GUIDE),
    ("review", "Code review checklist", REVIEW_GUIDE),
];

/// Template storage, diffing and application.
pub struct TemplateService;

impl TemplateService {
    pub fn built_ins(category: TemplateCategory) -> Vec<Template> {
        BUILT_INS
            .iter()
            .map(|(slug, name, content)| Template {
                id: format!("builtin-{}-{slug}", category.app()),
                name: (*name).to_string(),
                category,
                content: (*content).to_string(),
                built_in: true,
            })
            .collect()
    }

    fn load_user_templates() -> Result<Vec<Template>, AppError> {
        let file: TemplateFile = read_json_file_opt(&get_templates_path())?.unwrap_or_default();
        Ok(file
            .templates
            .into_iter()
            .map(|mut t| {
                t.built_in = false;
                t
            })
            .collect())
    }

    fn save_user_templates(templates: Vec<Template>) -> Result<(), AppError> {
        write_json_file(&get_templates_path(), &TemplateFile { templates })
    }

    /// Built-ins first, then user templates by name.
    pub fn list(category: TemplateCategory) -> Result<Vec<Template>, AppError> {
        let mut user = Self::load_user_templates()?
            .into_iter()
            .filter(|t| t.category == category)
            .collect::<Vec<_>>();
        user.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let mut all = Self::built_ins(category);
        all.extend(user);
        Ok(all)
    }

    pub fn get(id: &str) -> Result<Option<Template>, AppError> {
        let built_in = [
            TemplateCategory::ClaudeMd,
            TemplateCategory::AgentsMd,
            TemplateCategory::GeminiMd,
        ]
        .into_iter()
        .flat_map(Self::built_ins)
        .find(|t| t.id == id);
        if built_in.is_some() {
            return Ok(built_in);
        }
        Ok(Self::load_user_templates()?.into_iter().find(|t| t.id == id))
    }

    pub fn add(
        name: &str,
        category: TemplateCategory,
        content: String,
    ) -> Result<Template, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Template name is required".into()));
        }

        let mut templates = Self::load_user_templates()?;
        let existing = templates.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        let slug = crate::provider::generate_provider_id(name, &[]);
        let id = crate::provider::generate_provider_id(&format!("user-{slug}"), &existing);

        let template = Template {
            id,
            name: name.to_string(),
            category,
            content,
            built_in: false,
        };
        templates.push(template.clone());
        Self::save_user_templates(templates)?;
        log::info!("saved template '{}'", template.id);
        Ok(template)
    }

    /// Stores the current contents of `source` as a new user template.
    pub fn add_from_file(
        name: &str,
        category: TemplateCategory,
        source: &Path,
    ) -> Result<Template, AppError> {
        let content = read_text_file_opt(source)?
            .ok_or_else(|| AppError::NotFound(format!("{}", source.display())))?;
        Self::add(name, category, content)
    }

    pub fn delete(id: &str) -> Result<(), AppError> {
        if Self::get(id)?.is_some_and(|t| t.built_in) {
            return Err(AppError::InvalidInput(
                "Built-in templates cannot be deleted".into(),
            ));
        }
        let mut templates = Self::load_user_templates()?;
        let before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == before {
            return Err(AppError::NotFound(format!("template {id}")));
        }
        Self::save_user_templates(templates)
    }

    /// Global file in the tool's config dir, then the file in `project_dir`.
    pub fn targets_in(category: TemplateCategory, project_dir: &Path) -> Vec<TemplateTarget> {
        let file = category.file_name();
        [
            (category.global_dir().join(file), format!("Global {file}")),
            (project_dir.join(file), format!("Project {file}")),
        ]
        .into_iter()
        .map(|(path, label)| TemplateTarget {
            exists: path.exists(),
            path,
            label,
        })
        .collect()
    }

    pub fn targets(category: TemplateCategory) -> Vec<TemplateTarget> {
        let cwd = std::env::current_dir().unwrap_or_else(|e| {
            log::warn!("cannot resolve the working directory, using '.': {e}");
            PathBuf::from(".")
        });
        Self::targets_in(category, &cwd)
    }

    /// Unified diff from the target's current content (empty when missing) to the template.
    pub fn diff(template: &Template, target: &Path) -> Result<String, AppError> {
        let current = read_text_file_opt(target)?.unwrap_or_default();
        Ok(Self::diff_text(&current, &template.content, target))
    }

    /// Unified diff of `current` to `wanted`, empty when they are equal.
    pub fn diff_text(current: &str, wanted: &str, target: &Path) -> String {
        if current == wanted {
            return String::new();
        }
        let old_header = format!("a/{}", target.display());
        let new_header = format!("b/{}", target.display());
        TextDiff::from_lines(current, wanted)
            .unified_diff()
            .context_radius(3)
            .header(&old_header, &new_header)
            .to_string()
    }

    pub fn apply(template: &Template, target: &Path) -> Result<(), AppError> {
        crate::config::atomic_write(target, template.content.as_bytes())?;
        log::info!("applied template '{}' to {}", template.id, target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::ffi::OsString;
    use tempfile::TempDir;

    struct ConfigDirGuard(Option<OsString>);

    impl ConfigDirGuard {
        fn set(dir: &Path) -> Self {
            let old = std::env::var_os(crate::config::CONFIG_DIR_ENV);
            std::env::set_var(crate::config::CONFIG_DIR_ENV, dir);
            Self(old)
        }
    }

    impl Drop for ConfigDirGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(v) => std::env::set_var(crate::config::CONFIG_DIR_ENV, v),
                None => std::env::remove_var(crate::config::CONFIG_DIR_ENV),
            }
        }
    }

    #[test]
    fn diff_against_missing_target_inserts_every_line() {
        let dir = TempDir::new().expect("tempdir");
        let template = &TemplateService::built_ins(TemplateCategory::ClaudeMd)[0];
        let diff = TemplateService::diff(template, &dir.path().join("CLAUDE.md")).expect("diff");

        let body = diff
            .lines()
            .filter(|l| !l.starts_with("+++") && !l.starts_with("---") && !l.starts_with("@@"))
            .collect::<Vec<_>>();
        assert!(!body.is_empty());
        assert!(body.iter().all(|l| l.starts_with('+')));
        assert_eq!(body.len(), template.content.lines().count());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn targets_fall_back_to_relative_project_path_without_working_directory() {
        let original = std::env::current_dir().expect("cwd");
        let dir = TempDir::new().expect("tempdir");
        let gone = dir.path().join("gone");
        std::fs::create_dir(&gone).expect("mkdir");
        std::env::set_current_dir(&gone).expect("chdir");
        std::fs::remove_dir(&gone).expect("rmdir");

        let targets = TemplateService::targets(TemplateCategory::ClaudeMd);
        std::env::set_current_dir(&original).expect("restore cwd");

        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets[1].path,
            Path::new(".").join(TemplateCategory::ClaudeMd.file_name())
        );
    }

    #[test]
    fn diff_of_identical_content_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let template = &TemplateService::built_ins(TemplateCategory::AgentsMd)[1];
        let target = dir.path().join("AGENTS.md");
        TemplateService::apply(template, &target).expect("apply");
        assert_eq!(
            std::fs::read(&target).expect("read"),
            template.content.as_bytes()
        );
        assert!(TemplateService::diff(template, &target).expect("diff").is_empty());
    }

    #[test]
    #[serial]
    fn user_templates_round_trip_and_built_ins_are_protected() {
        let dir = TempDir::new().expect("tempdir");
        let _guard = ConfigDirGuard::set(dir.path());

        let source = dir.path().join("GEMINI.md");
        std::fs::write(&source, "# mine\n").expect("seed source");
        let saved = TemplateService::add_from_file("Mine", TemplateCategory::GeminiMd, &source)
            .expect("save from file");
        assert_eq!(saved.id, "user-mine");

        let listed = TemplateService::list(TemplateCategory::GeminiMd).expect("list");
        assert_eq!(listed.len(), 3);
        assert_eq!(listed.last().map(|t| t.id.as_str()), Some("user-mine"));
        assert!(TemplateService::list(TemplateCategory::ClaudeMd)
            .expect("list claude")
            .iter()
            .all(|t| t.built_in));

        let builtin_id = listed[0].id.clone();
        let err = TemplateService::delete(&builtin_id).expect_err("built-in");
        assert!(matches!(err, AppError::InvalidInput(_)));

        TemplateService::delete("user-mine").expect("delete user template");
        assert!(TemplateService::get("user-mine").expect("get").is_none());
    }

    #[test]
    fn targets_report_existence() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("AGENTS.md"), "x").expect("seed");
        let targets = TemplateService::targets_in(TemplateCategory::AgentsMd, dir.path());
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].label, "Project AGENTS.md");
        assert!(targets[1].exists);
    }
}
