use serde::{Deserialize, Serialize};

/// The skeleton of a course as produced by the generator, before any lesson
/// has content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOutline {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    pub modules: Vec<ModuleOutline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lessons: Vec<LessonOutline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonOutline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CourseOutline {
    /// Reject outlines that would produce an empty or untitled course.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("outline has no title".to_string());
        }
        if self.modules.is_empty() {
            return Err("outline has no modules".to_string());
        }
        for (i, module) in self.modules.iter().enumerate() {
            if module.title.trim().is_empty() {
                return Err(format!("module {} has no title", i));
            }
            if module.lessons.is_empty() {
                return Err(format!("module {:?} has no lessons", module.title));
            }
            if let Some(j) = module.lessons.iter().position(|l| l.title.trim().is_empty()) {
                return Err(format!("lesson {} of module {:?} has no title", j, module.title));
            }
        }
        Ok(())
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(modules: Vec<ModuleOutline>) -> CourseOutline {
        CourseOutline {
            title: "Rust Basics".to_string(),
            description: "Learn Rust".to_string(),
            target_audience: None,
            prerequisites: vec![],
            learning_outcomes: vec![],
            modules,
        }
    }

    #[test]
    fn parses_camel_case_with_missing_optionals() {
        let parsed: CourseOutline = serde_json::from_str(
            r#"{
                "title": "Rust Basics",
                "description": "Learn Rust",
                "targetAudience": "Beginners",
                "modules": [
                    { "title": "Syntax", "lessons": [{ "title": "Variables" }] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.target_audience.as_deref(), Some("Beginners"));
        assert!(parsed.prerequisites.is_empty());
        assert_eq!(parsed.lesson_count(), 1);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn rejects_outline_without_modules() {
        assert!(outline(vec![]).validate().is_err());
    }

    #[test]
    fn rejects_module_without_lessons() {
        let result = outline(vec![ModuleOutline {
            title: "Empty".to_string(),
            description: None,
            lessons: vec![],
        }])
        .validate();
        assert_eq!(result, Err("module \"Empty\" has no lessons".to_string()));
    }
}
