// src/escalation/mod.rs
//! Human escalation contacts, one record per support category.
//!
//! The directory is static data compiled into the binary; lookups never
//! fail. Prospective students are always routed to admissions because the
//! internal support departments only serve enrolled students.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::session::UserType;

/// Escalation categories the intent classifier can produce. Anything else
/// resolves to `general`.
const CATEGORIES: [&str; 7] = [
    "fees",
    "wellness",
    "mental_health",
    "academics",
    "admissions",
    "technical",
    "general",
];

/// One human contact point a conversation can be handed off to.
#[derive(Debug, Clone, Serialize)]
pub struct ContactRecord {
    pub department: String,
    pub contact_person: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_line: Option<String>,
    pub office_hours: String,
    pub response_time: String,
    pub services: Vec<String>,
}

impl ContactRecord {
    /// Markdown block appended to a reply when an exchange escalates.
    pub fn format_block(&self) -> String {
        let mut message = format!("📞 **{}**\n\n", self.department);
        message.push_str(&format!("**Contact:** {}\n", self.contact_person));
        message.push_str(&format!("**Email:** {}\n", self.email));
        if let Some(phone) = &self.phone {
            message.push_str(&format!("**Phone:** {}\n", phone));
        }
        if let Some(line) = &self.emergency_line {
            message.push_str(&format!("**24/7 Crisis Line:** {}\n", line));
        }
        message.push_str(&format!("**Office Hours:** {}\n", self.office_hours));
        message.push_str(&format!("**Expected Response Time:** {}\n", self.response_time));
        message.push_str("\nI'll connect you with them to help resolve your concern.");
        message
    }
}

pub struct ContactDirectory {
    contacts: HashMap<&'static str, ContactRecord>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        let mut contacts = HashMap::new();

        contacts.insert(
            "fees",
            ContactRecord {
                department: "Student Accounts - Fee Inquiries".to_string(),
                contact_person: "Mai Tran".to_string(),
                email: "student.accounts@northfield.edu".to_string(),
                phone: None,
                emergency_line: None,
                office_hours: "Mon-Thurs 8:30am-12:30pm, Fri 10:00am-12:00pm".to_string(),
                response_time: "2-4 business days".to_string(),
                services: vec![
                    "Fee exemptions".to_string(),
                    "Transit pass inquiries".to_string(),
                    "Recreation fee questions".to_string(),
                ],
            },
        );
        contacts.insert(
            "wellness",
            ContactRecord {
                department: "Student Wellbeing Centre".to_string(),
                contact_person: "Counselling Team".to_string(),
                email: "wellbeing@northfield.edu".to_string(),
                phone: Some("416-555-0144 ext. 2700".to_string()),
                emergency_line: None,
                office_hours: "8:00am-10:00pm daily".to_string(),
                response_time: "45 minutes for callback".to_string(),
                services: vec![
                    "Mental health support".to_string(),
                    "Counselling".to_string(),
                    "Crisis intervention".to_string(),
                    "Stress management".to_string(),
                ],
            },
        );
        contacts.insert(
            "mental_health",
            ContactRecord {
                department: "Student Wellbeing Centre - Crisis Support".to_string(),
                contact_person: "Crisis Counsellor".to_string(),
                email: "wellbeing@northfield.edu".to_string(),
                phone: Some("416-555-0144 ext. 2700".to_string()),
                emergency_line: Some("1-833-555-0199".to_string()),
                office_hours: "24/7 crisis line available".to_string(),
                response_time: "Immediate".to_string(),
                services: vec![
                    "Crisis intervention".to_string(),
                    "Emergency mental health support".to_string(),
                ],
            },
        );
        contacts.insert(
            "academics",
            ContactRecord {
                department: "Academic Advising".to_string(),
                contact_person: "Academic Advisor".to_string(),
                email: "advising@northfield.edu".to_string(),
                phone: Some("416-555-0144 ext. 2480".to_string()),
                emergency_line: None,
                office_hours: "Mon-Fri 9:00am-4:00pm".to_string(),
                response_time: "1-2 business days".to_string(),
                services: vec![
                    "Course selection".to_string(),
                    "Academic planning".to_string(),
                    "Program requirements".to_string(),
                ],
            },
        );
        contacts.insert(
            "admissions",
            ContactRecord {
                department: "Admissions - Degree Completion Programs".to_string(),
                contact_person: "Dr. Imogen Hale".to_string(),
                email: "admissions@northfield.edu".to_string(),
                phone: Some("416-555-0144 ext. 2450".to_string()),
                emergency_line: None,
                office_hours: "Mon-Thurs 9:00am-3:00pm".to_string(),
                response_time: "1-2 business days".to_string(),
                services: vec![
                    "Degree completion program".to_string(),
                    "Application questions".to_string(),
                    "Program information".to_string(),
                ],
            },
        );
        contacts.insert(
            "technical",
            ContactRecord {
                department: "IT Service Desk".to_string(),
                contact_person: "Tech Support".to_string(),
                email: "helpdesk@northfield.edu".to_string(),
                phone: Some("416-555-0144 ext. 2435".to_string()),
                emergency_line: None,
                office_hours: "Mon-Fri 8:00am-5:00pm".to_string(),
                response_time: "24 hours".to_string(),
                services: vec![
                    "Portal access".to_string(),
                    "Email issues".to_string(),
                    "Online platform support".to_string(),
                ],
            },
        );
        contacts.insert(
            "general",
            ContactRecord {
                department: "Student Services".to_string(),
                contact_person: "Student Support".to_string(),
                email: "student.services@northfield.edu".to_string(),
                phone: Some("416-555-0144".to_string()),
                emergency_line: None,
                office_hours: "Mon-Fri 8:30am-4:30pm".to_string(),
                response_time: "1-2 business days".to_string(),
                services: vec!["General inquiries".to_string(), "Student support".to_string()],
            },
        );

        Self { contacts }
    }

    /// Contact for a category and user type. Unknown categories resolve to
    /// `general`; prospective students are redirected to admissions for
    /// every category except admissions itself.
    pub fn contact(&self, category: &str, user_type: UserType) -> &ContactRecord {
        if user_type == UserType::Prospective && category != "admissions" {
            return &self.contacts["admissions"];
        }
        self.contacts.get(category).unwrap_or(&self.contacts["general"])
    }

    /// The full directory for a user type. Prospective students only see
    /// the departments that serve non-enrolled students.
    pub fn all(&self, user_type: UserType) -> BTreeMap<&'static str, &ContactRecord> {
        CATEGORIES
            .iter()
            .filter(|category| {
                user_type == UserType::Current
                    || matches!(**category, "admissions" | "general")
            })
            .map(|category| (*category, &self.contacts[category]))
            .collect()
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new()
    }
}
