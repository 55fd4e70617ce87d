mod cook;
mod data;
mod favorite;
mod helpers;
mod recipe;

pub(crate) use cook::cmd_cook;
pub(crate) use data::{cmd_data_export, cmd_data_import, cmd_data_info};
pub(crate) use favorite::{
    cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove, cmd_favorite_toggle,
};
pub(crate) use recipe::{
    RecipeEdit, cmd_add, cmd_categories, cmd_count, cmd_delete, cmd_edit, cmd_list, cmd_show,
};
