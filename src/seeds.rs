//! Built-in course content, so the player is usable without a config file.

use crate::domain::{ContentType, Course, Lesson, Question, QuestionGroup, QuestionKind, Week, Workbook};

pub const SEED_COURSE_ID: &str = "perinatal-foundations";

fn lesson(id: &str, title: &str, duration: &str, transcript: &str) -> Lesson {
  Lesson {
    id: id.into(),
    title: title.into(),
    duration: duration.into(),
    content_type: ContentType::Video,
    transcript: transcript.into(),
    video_url: None,
  }
}

fn free_text(id: &str, prompt: &str, required: bool) -> Question {
  Question {
    id: id.into(),
    prompt: prompt.into(),
    required,
    kind: QuestionKind::FreeText { placeholder: None },
  }
}

/// The built-in course. Week 1 and 2 carry workbooks; week 3 does not.
pub fn seed_courses() -> Vec<Course> {
  vec![Course {
    id: SEED_COURSE_ID.into(),
    title: "Foundations of Perinatal Mental Health".into(),
    weeks: vec![
      Week {
        number: 1,
        title: "Understanding the Perinatal Period".into(),
        lessons: vec![
          lesson(
            "w1-l1",
            "Welcome and What to Expect",
            "9 min",
            "Welcome to the course. Over the next weeks we look at how pregnancy and the first year after birth affect mood, sleep and relationships.",
          ),
          lesson(
            "w1-l2",
            "Baby Blues or Something More?",
            "14 min",
            "Most new parents feel tearful in the first two weeks. We compare that with symptoms that last longer or interfere with daily life.",
          ),
          lesson(
            "w1-l3",
            "Screening with the EPDS",
            "11 min",
            "The Edinburgh Postnatal Depression Scale is a ten item questionnaire. Each item is scored from 0 to 3 based on the past seven days.",
          ),
        ],
        workbook: Some(Workbook {
          title: "Week 1 Reflection".into(),
          groups: vec![
            QuestionGroup {
              id: "w1-g1".into(),
              title: "Checking In".into(),
              questions: vec![
                free_text("w1-q1", "What made you interested in this course?", true),
                Question {
                  id: "w1-q2".into(),
                  prompt: "In the past 7 days, I have been able to laugh and see the funny side of things.".into(),
                  required: true,
                  kind: QuestionKind::Scale {
                    min: 0,
                    max: 3,
                    min_label: Some("As much as I always could".into()),
                    max_label: Some("Not at all".into()),
                    followup: Some("Anything you want to add about this week?".into()),
                  },
                },
              ],
            },
            QuestionGroup {
              id: "w1-g2".into(),
              title: "Support Map".into(),
              questions: vec![Question {
                id: "w1-q3".into(),
                prompt: "Who could you reach out to for each kind of support?".into(),
                required: true,
                kind: QuestionKind::CategoryMapping {
                  categories: vec![
                    "Practical help".into(),
                    "Emotional support".into(),
                    "Professional care".into(),
                  ],
                },
              }],
            },
          ],
        }),
      },
      Week {
        number: 2,
        title: "Sleep, Stress and Recovery".into(),
        lessons: vec![
          lesson(
            "w2-l1",
            "Sleep Disruption After Birth",
            "12 min",
            "Broken sleep is expected with a newborn. We look at protecting one longer stretch of sleep and sharing night feeds.",
          ),
          lesson(
            "w2-l2",
            "Noticing Your Stress Signals",
            "10 min",
            "Stress shows up in the body first. This lesson walks through a short body scan you can use during feeds.",
          ),
        ],
        workbook: Some(Workbook {
          title: "Week 2 Practice Log".into(),
          groups: vec![QuestionGroup {
            id: "w2-g1".into(),
            title: "This Week".into(),
            questions: vec![
              free_text("w2-q1", "Which early stress signal did you notice most often?", true),
              free_text("w2-q2", "What helped, even a little?", false),
            ],
          }],
        }),
      },
      Week {
        number: 3,
        title: "Looking Ahead".into(),
        lessons: vec![lesson(
          "w3-l1",
          "Building Your Care Plan",
          "15 min",
          "We bring the course together into a written plan: warning signs, people to contact, and small daily anchors.",
        )],
        workbook: None,
      },
    ],
  }]
}
