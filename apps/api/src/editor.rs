//! Editor state for the resume form and its live preview.
//!
//! The state is a plain value owned by whoever drives the form. It changes
//! only through `reduce`, which replaces one section at a time and returns
//! the new state. The preview is the same HTML the PDF is printed from.

use serde::Serialize;

use crate::models::{Education, Experience, Personal, ResumeDocument};
use crate::render::{render_resume, resolve_photo_url, TemplateVariant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub template: TemplateVariant,
    pub preview_visible: bool,
    pub document: ResumeDocument,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    SetPersonal(Personal),
    SetSummary(String),
    SetEducation(Vec<Education>),
    SetExperience(Vec<Experience>),
    SetSkills(Vec<String>),
    SetLanguages(Vec<String>),
    SetInterests(Vec<String>),
    SetTemplate(TemplateVariant),
    TogglePreview(bool),
}

/// Required personal fields the form enforces before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Name,
    Email,
    Phone,
}

pub fn reduce(state: EditorState, action: EditorAction) -> EditorState {
    let EditorState {
        mut template,
        mut preview_visible,
        mut document,
    } = state;

    match action {
        EditorAction::SetPersonal(personal) => document.personal = personal,
        EditorAction::SetSummary(summary) => document.summary = summary,
        EditorAction::SetEducation(education) => document.education = education,
        EditorAction::SetExperience(experience) => document.experience = experience,
        EditorAction::SetSkills(skills) => document.skills = skills,
        EditorAction::SetLanguages(languages) => document.languages = languages,
        EditorAction::SetInterests(interests) => document.interests = interests,
        EditorAction::SetTemplate(variant) => {
            template = variant;
            document.template = variant.as_str().to_string();
        }
        EditorAction::TogglePreview(visible) => preview_visible = visible,
    }

    EditorState {
        template,
        preview_visible,
        document,
    }
}

impl EditorState {
    /// Missing required fields, in form order. Empty means submittable.
    pub fn validate(&self) -> Vec<RequiredField> {
        let personal = &self.document.personal;
        [
            (RequiredField::Name, &personal.name),
            (RequiredField::Email, &personal.email),
            (RequiredField::Phone, &personal.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Renders the preview against an already loaded layout.
    pub fn preview(&self, layout: &str, public_base: &str) -> String {
        let photo = resolve_photo_url(&self.document.personal.photo, public_base);
        render_resume(layout, &self.document, photo.as_deref())
    }

    /// The JSON body posted to `/api/resume/generate`.
    pub fn request_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.document)
    }
}
