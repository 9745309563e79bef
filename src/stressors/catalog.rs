//! Bundled stressor catalog.

use super::{Stressor, StressorCategory};

/// (category, name, description, severity, likely duration)
const BUILTIN: &[(&str, &str, &str, u8, &str)] = &[
    ("Social/Environmental", "Drinking-centered events", "Attended an event where alcohol was central", 2, "Hours-Days"),
    ("Social/Environmental", "Lack of social support", "No one to call when cravings hit", 2, "Hours"),
    ("Social/Environmental", "Social isolation", "Spent the weekend alone with no plans", 3, "Days–Weeks"),
    ("Social/Environmental", "Living with active substance users", "Household member continues drinking or using substances", 3, "Weeks–Months"),
    ("Interpersonal", "Relationship conflict", "Unresolved argument with partner", 3, "Days–Weeks"),
    ("Interpersonal", "Breakup/rejection", "Partner ended relationship unexpectedly", 3, "Weeks–Months"),
    ("Interpersonal", "Family conflict", "Ongoing tension or conflict with family members", 3, "Weeks–Months"),
    ("Work/Academic", "Deadlines/pressure", "Multiple deadlines in same week", 2, "Days–Weeks"),
    ("Work/Academic", "Job insecurity", "Fear of layoffs or reduced hours", 2, "Weeks–Months"),
    ("Work/Academic", "Burnout/overwork", "Sustained overtime with little recovery", 2, "Weeks–Months"),
    ("Work/Academic", "Academic failure", "Failed an important exam", 2, "Days–Weeks"),
    ("Emotional/Cognitive", "Negative emotions", "Persistent anxiety, anger, or sadness", 3, "Hours–Weeks"),
    ("Emotional/Cognitive", "Boredom/anhedonia", "Nothing feels engaging or rewarding", 1, "Days–Weeks"),
    ("Emotional/Cognitive", "Overconfidence", "Feeling cured; belief one drink is safe", 2, "Hours–Days"),
    ("Emotional/Cognitive", "Low self-efficacy", "Doubting ability to stay sober", 3, "Weeks–Months"),
    ("Emotional/Cognitive", "Cognitive distortions", "I've already slipped so it doesn't matter", 3, "Hours–Days"),
    ("Emotional/Cognitive", "Rumination", "Can't stop thinking about drinking", 2, "Days"),
    ("Emotional/Cognitive", "Cognitive impairment / mental fog", "Difficulty concentrating and remembering coping strategies", 2, "Days–Weeks"),
    ("Emotional/Cognitive", "Trauma reminders", "Encountered a reminder of a past traumatic event", 3, "Hours–Days"),
    ("Physical/Biological", "Pain or injury", "Chronic or acute pain", 2, "Days–Weeks"),
    ("Physical/Biological", "Sleep deprivation", "Several nights of poor sleep due to racing thoughts or insomnia", 2, "Days–Weeks"),
    ("Physical/Biological", "Withdrawal", "Ongoing irritability and anxiety post-quitting", 2, "Weeks–Months"),
    ("Life Events", "Major transitions", "Moving to a new job / new city", 2, "Weeks–Months"),
    ("Life Events", "Bereavement", "Death of a loved one", 3, "Months"),
    ("Life Events", "Financial crisis", "Unexpected bills or debt", 3, "Weeks–Months"),
    ("Treatment/Recovery", "Negative treatment experience", "Felt judged by clinician", 2, "Weeks–Months"),
    ("Treatment/Recovery", "Successful refusal", "Refused a drink", 3, "Hours–Days"),
    ("Treatment/Recovery", "Successful use of coping strategy", "Did not act on an urge to drink by using a coping strategy", 3, "Hours–Days"),
    ("Supportive events", "Reconnected with a sober friend", "Spent an evening with a friend who supports recovery", 2, "Days–Weeks"),
    ("Supportive events", "Positive feedback", "Received recognition for progress at work", 1, "Days"),
    ("Supportive events", "Support meeting", "Attended a peer support meeting and shared", 2, "Hours–Days"),
];

/// Fresh copy of the bundled catalog entries.
pub fn builtin_stressors() -> Vec<Stressor> {
    BUILTIN
        .iter()
        .map(|&(category, name, description, severity, duration)| {
            Stressor::new(
                StressorCategory::from(category),
                name,
                description,
                severity,
                duration,
            )
        })
        .collect()
}
