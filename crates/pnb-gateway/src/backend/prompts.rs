//! Prompt text sent to the models
//!
//! The game is played in Spanish, so questions and grading are too.

use rand::seq::SliceRandom;

/// Topics a scene question can be about
pub const QUESTION_CATEGORIES: &[&str] = &[
    "colores (de ropa, cabello, objetos, fondo)",
    "posiciones (dónde están parados/sentados los personajes)",
    "acciones (qué están haciendo los personajes)",
    "emociones (expresiones faciales: feliz, triste, sorprendido, etc.)",
    "ropa/accesorios (qué llevan puesto los personajes)",
    "objetos (qué elementos hay en la escena)",
    "cantidades (cuántos personajes u objetos se ven)",
    "tamaños (comparaciones: más grande/pequeño)",
    "formas (formas de objetos o elementos)",
    "relaciones (quién está al lado de quién, interacciones)",
];

/// System instruction for answer grading; the model must reply `si` or `no`
pub const VALIDATION_INSTRUCTION: &str = "Eres un evaluador de respuestas para un juego. \
Tu única función es determinar si la respuesta de un usuario es correcta. \
Debes responder ÚNICAMENTE con la palabra 'si' o 'no', en minúsculas y sin ningún otro texto o puntuación.";

/// Pick a question category at random
pub(crate) fn random_category() -> &'static str {
    QUESTION_CATEGORIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(QUESTION_CATEGORIES[0])
}

pub(crate) fn analysis_prompt(category: &str) -> String {
    format!(
        "Observa esta imagen. Genera un objeto JSON con el siguiente esquema. \
         La 'challenge' debe ser una pregunta simple sobre {} en la imagen. \
         La 'solution' debe ser la respuesta corta y directa a esa pregunta. \
         El texto debe estar en español.",
        category
    )
}

pub(crate) fn validation_prompt(challenge: &str, solution: &str, player_response: &str) -> String {
    format!(
        "Pregunta: \"{}\"\nRespuesta Correcta: \"{}\"\nRespuesta del Usuario: \"{}\"",
        challenge, solution, player_response
    )
}
