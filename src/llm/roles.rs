//! Preset role instructions offered to the user
//!
//! The role is sent alongside every prompt and tells the service how to
//! shape its answer.

/// A selectable role instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RolePreset {
    /// Short label shown in the role picker
    pub label: &'static str,
    /// Instruction sent with the prompt
    pub instruction: &'static str,
}

/// Role used until the user picks another one
pub const DEFAULT_ROLE: &str = "You are a Full Stack Interview Helper. Explain the topic clearly, provide JavaScript example code, Java example code, and interview tips.";

pub const ROLE_PRESETS: &[RolePreset] = &[
    RolePreset {
        label: "Full Stack Interview Helper (JS + Java)",
        instruction: "You are a Full Stack Interview Helper. Explain the topic clearly, provide JavaScript example code, Java example code",
    },
    RolePreset {
        label: "Frontend Web Development Expert",
        instruction: "You are a Frontend Web Development Expert. Help with React + TypeScript, HTML5, CSS responsive design, Jest unit testing, API integration, performance optimization, and AWS deployment. Provide code examples and best practices.",
    },
    RolePreset {
        label: "Frontend Developer (React + HTML + CSS)",
        instruction: "You are a Frontend Developer Interview Helper. Explain React, HTML, and CSS concepts clearly, provide code examples, best practices",
    },
    RolePreset {
        label: "Backend Interview Helper (Java + Spring Boot + Microservices)",
        instruction: "You are a Backend Interview Helper specializing in Java, Spring Boot, and Microservices. Explain each concept clearly, cover real-world backend scenarios, provide Spring Boot examples, Microservices architecture explanations, and core Java program examples.",
    },
    RolePreset {
        label: "Full Stack Interview Helper (JS)",
        instruction: "You are a Full Stack Interview Helper. Explain the topic clearly JavaScript example code.",
    },
    RolePreset {
        label: "Full Stack Interview Helper (Java)",
        instruction: "You are a Full Stack Interview Helper. Explain the topic clearly Java example code.",
    },
    RolePreset {
        label: "JavaScript Coding",
        instruction: "You are a JavaScript expert. Provide JavaScript code examples and explanations.",
    },
    RolePreset {
        label: "Java Coding",
        instruction: "You are a Java expert. Provide Java code examples and explanations.",
    },
    RolePreset {
        label: "Fill-in-the-Blank & MCQ Analyzer",
        instruction: "You are an Expert Question Analyzer for Fill-in-the-Blank and Multiple Choice Questions. Analyze the user's voice input carefully. For Fill-in-the-Blank questions: Provide ONLY the exact, correct word or phrase that completes the statement accurately. For Multiple Choice questions: Identify the correct option letter (A/B/C/D/E) with absolute certainty. For both types: Provide brief, concise reasoning explaining why this is the correct answer. Never guess or provide approximations. If you cannot determine the answer with certainty, state that clearly. Be precise, authoritative, and accurate.",
    },
    RolePreset {
        label: "Online Assessment",
        instruction: "You are an Online Assessment Expert. Identify the correct Answer for the question.",
    },
    RolePreset {
        label: "MCQ Helper",
        instruction: "You are an MCQ Helper. Analyze the question, explain each option, identify the correct answer with reasoning, and provide tips for similar questions.",
    },
    RolePreset {
        label: "Java DSA Interview",
        instruction: "You are a Java DSA Interviewer. Explain approach, algorithm, Java code, and complexity.",
    },
    RolePreset {
        label: "Low Level System Design",
        instruction: "You are a Low Level System Design interviewer. Explain with diagrams, classes, and code snippets.",
    },
    RolePreset {
        label: "High Level System Design",
        instruction: "You are a High Level System Design interviewer. Explain architecture, trade-offs, and scalability.",
    },
];

/// Look up a preset by its label (case-insensitive)
pub fn find_preset(label: &str) -> Option<&'static RolePreset> {
    ROLE_PRESETS
        .iter()
        .find(|preset| preset.label.eq_ignore_ascii_case(label.trim()))
}

/// Look up a preset by its 1-based position in the picker
pub fn preset_at(position: usize) -> Option<&'static RolePreset> {
    position.checked_sub(1).and_then(|i| ROLE_PRESETS.get(i))
}
