use crate::quiz::QuizRequest;

const RESPONSE_FORMAT_INSTRUCTIONS: &str = "Respond ONLY with a valid JSON array, where each element is an object \
with exactly the keys \"question\" (string) and \"answer\" (string). Do not include any other text, \
markdown formatting, code fences, or explanations outside the JSON array.";

pub fn build_prompt(topic: &str, difficulty: u8, count: u8) -> String {
    format!(
        "Generate {count} quiz questions on the topic '{topic}', \
         at difficulty level {difficulty}/10. {RESPONSE_FORMAT_INSTRUCTIONS}"
    )
}

pub fn build_prompt_for(request: &QuizRequest) -> String {
    build_prompt(request.topic(), request.difficulty(), request.count())
}
