pub mod directors;
pub mod genres;
pub mod movie_details;
pub mod movie_genres;
pub mod movie_user_likes;
pub mod movies;
pub mod users;

pub use directors::Entity as Directors;
pub use genres::Entity as Genres;
pub use movie_details::Entity as MovieDetails;
pub use movie_genres::Entity as MovieGenres;
pub use movie_user_likes::Entity as MovieUserLikes;
pub use movies::Entity as Movies;
pub use users::Entity as Users;

pub type Director = directors::Model;
pub type Genre = genres::Model;
pub type MovieDetail = movie_details::Model;
pub type Movie = movies::Model;
pub type MovieUserLike = movie_user_likes::Model;
pub type User = users::Model;
