pub const DISCOVERY_SYSTEM_PROMPT: &str = "You are deciding which single official website belongs to a given company from a list of search results. Respond with a JSON object of the form {\"site\": \"<url>\"}, or {\"site\": \"nao_encontrado\"} if none of the results are a plausible match. No other text.";

pub const SINGLE_CHUNK_SYSTEM_PROMPT: &str = "Extract a structured company profile as a JSON object from the page content below. Only use information present in the content.";

pub const MULTI_CHUNK_SYSTEM_PROMPT: &str = "Extract whatever structured company-profile fields are supported by this partial excerpt of a larger site, as a JSON object. Omit fields with no evidence in this excerpt; do not guess values from outside it.";
