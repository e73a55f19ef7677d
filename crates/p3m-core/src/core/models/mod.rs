pub mod forces;
pub mod mesh;
pub mod system;
