mod seir;

pub use seir::*;
