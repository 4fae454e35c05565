//! Known field taxonomies per platform family. Names are canonical keys.

use crate::forms::models::{FieldType, FormField};

/// Greenhouse, Workday and Lever style application forms.
pub fn ats_fields() -> Vec<FormField> {
    use FieldType::*;
    vec![
        FormField::new("first_name", "First Name", Text, true),
        FormField::new("last_name", "Last Name", Text, true),
        FormField::new("email", "Email", Email, true),
        FormField::new("phone", "Phone", Phone, true),
        FormField::new("location", "Current Location", Text, true),
        FormField::new("resume", "Resume", File, true),
        FormField::new("cover_letter", "Cover Letter", File, false),
        FormField::new("linkedin_url", "LinkedIn Profile", Url, false),
        FormField::new("portfolio_url", "Portfolio/Website", Url, false),
        FormField::new("github_url", "GitHub Profile", Url, false),
        FormField::new("years_experience", "Years of Experience", Number, true),
        FormField::new("current_company", "Current Company", Text, false),
        FormField::new("current_title", "Current Job Title", Text, false),
        FormField::new("expected_salary", "Expected Salary", Text, false),
        FormField::new("availability", "When can you start?", Select, true).with_options(&[
            "Immediately",
            "2 weeks",
            "1 month",
            "2 months",
            "Other",
        ]),
        FormField::new(
            "work_authorization",
            "Are you authorized to work in the US?",
            Select,
            true,
        )
        .with_options(&["Yes", "No", "Need Sponsorship"]),
        FormField::new(
            "require_sponsorship",
            "Will you require sponsorship?",
            Select,
            true,
        )
        .with_options(&["Yes", "No"]),
        FormField::new("referral_source", "How did you hear about us?", Select, false)
            .with_options(&["LinkedIn", "Company Website", "Indeed", "Referral", "Other"]),
        FormField::new("referred_by", "Referred by (Employee Name)", Text, false),
        FormField::new(
            "why_interested",
            "Why are you interested in this role?",
            Textarea,
            false,
        ),
        FormField::new(
            "relevant_experience",
            "Describe your relevant experience",
            Textarea,
            false,
        ),
        FormField::new("gender", "Gender (Optional)", Select, false).with_options(&[
            "Male",
            "Female",
            "Non-binary",
            "Prefer not to say",
        ]),
        FormField::new("ethnicity", "Ethnicity (Optional)", Select, false).with_options(&[
            "Asian",
            "Black",
            "Hispanic",
            "White",
            "Other",
            "Prefer not to say",
        ]),
        FormField::new("veteran_status", "Veteran Status (Optional)", Select, false)
            .with_options(&["Yes", "No", "Prefer not to say"]),
    ]
}

/// Indeed / Glassdoor quick-apply.
pub fn job_board_fields() -> Vec<FormField> {
    use FieldType::*;
    vec![
        FormField::new("full_name", "Full Name", Text, true),
        FormField::new("email", "Email", Email, true),
        FormField::new("phone", "Phone", Phone, true),
        FormField::new("resume", "Resume", File, true),
        FormField::new("years_experience", "Years of Experience", Select, true)
            .with_options(&["0-1", "2-3", "4-5", "6-10", "10+"]),
        FormField::new("education_level", "Highest Education", Select, true).with_options(&[
            "High School",
            "Associate",
            "Bachelor's",
            "Master's",
            "PhD",
        ]),
        FormField::new("willing_to_relocate", "Willing to relocate?", Boolean, false),
    ]
}

/// LinkedIn Easy Apply keeps the form short.
pub fn easy_apply_fields() -> Vec<FormField> {
    use FieldType::*;
    vec![
        FormField::new("email", "Email", Email, true),
        FormField::new("phone", "Phone", Phone, true),
        FormField::new("resume", "Resume", File, true),
        FormField::new(
            "years_experience",
            "How many years of experience do you have?",
            Number,
            true,
        ),
        FormField::new("notice_period", "Notice Period", Select, false).with_options(&[
            "Immediate",
            "2 weeks",
            "1 month",
            "2 months",
            "3 months",
        ]),
    ]
}
